use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::handlers::AppState;
use crate::services::ReconcileOutcome;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub const SIGNATURE_HEADER: &str = "x-payment-signature";

#[derive(Serialize)]
pub struct WebhookAck {
    outcome: &'static str,
}

/// Payment processor webhook. 401 when the signature fails (never retried by
/// the processor), 200 for every reconciled outcome including orphans (stops
/// re-delivery storms for cases that need a human), 5xx only on transient
/// store failure so the processor redelivers.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Response, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::AuthenticationFailed("Missing payment signature header".to_string())
        })?;

    let outcome = state.reconciler.reconcile_raw(&body, signature).await?;

    let label = match outcome {
        ReconcileOutcome::Confirmed { .. } => "confirmed",
        ReconcileOutcome::AlreadyProcessed { .. } => "already_processed",
        ReconcileOutcome::PaymentFailed { .. } => "payment_failed",
        ReconcileOutcome::Orphaned => "received",
    };
    Ok(success(WebhookAck { outcome: label }, "Notification received").into_response())
}

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::AppState;
use crate::services::{CheckInRequest, VerificationOutcome};
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInBody {
    pub code: Option<String>,
    pub manual_id: Option<Uuid>,
    pub event_id: Uuid,
    pub verifier_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

pub async fn check_in(
    State(state): State<AppState>,
    Json(payload): Json<CheckInBody>,
) -> Result<Response, AppError> {
    let outcome = state
        .verification
        .verify(CheckInRequest {
            code: payload.code,
            manual_id: payload.manual_id,
            event_id: payload.event_id,
            verifier_id: payload.verifier_id,
        })
        .await?;

    let body = match outcome {
        VerificationOutcome::Granted {
            holder_name,
            ticket_type_name,
            used_at,
        } => CheckInResponse {
            result: "granted",
            holder_name: Some(holder_name),
            ticket_type_name: Some(ticket_type_name),
            used_at: Some(used_at),
            reason: None,
        },
        VerificationOutcome::Duplicate { used_at } => CheckInResponse {
            result: "duplicate",
            holder_name: None,
            ticket_type_name: None,
            used_at,
            reason: None,
        },
        VerificationOutcome::Invalid => CheckInResponse {
            result: "invalid",
            holder_name: None,
            ticket_type_name: None,
            used_at: None,
            reason: Some("ticket_invalid"),
        },
    };
    Ok(success(body, "Check-in processed").into_response())
}

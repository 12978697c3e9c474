use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::handlers::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub ticket_id: Uuid,
    pub refund_amount: Decimal,
}

pub async fn refund_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let refund_amount = state.refunds.refund(ticket_id, Utc::now()).await?;

    let body = RefundResponse {
        ticket_id,
        refund_amount,
    };
    Ok(success(body, "Ticket refunded").into_response())
}

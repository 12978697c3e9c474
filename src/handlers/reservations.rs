use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::AppState;
use crate::models::PaymentStatus;
use crate::services::ReserveRequest;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub template_id: Uuid,
    pub buyer_id: Uuid,
    pub holder_name: String,
    pub holder_email: String,
    pub checkout_session_reference: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub ticket_id: Uuid,
    pub checkout_session_reference: String,
    pub status: PaymentStatus,
}

pub async fn create_reservation(
    State(state): State<AppState>,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<Response, AppError> {
    let ticket = state
        .reservations
        .reserve(ReserveRequest {
            template_id: payload.template_id,
            buyer_id: payload.buyer_id,
            holder_name: payload.holder_name,
            holder_email: payload.holder_email,
            checkout_session_reference: payload.checkout_session_reference,
        })
        .await?;

    let body = ReservationResponse {
        ticket_id: ticket.id,
        checkout_session_reference: ticket.checkout_session_reference,
        status: ticket.payment_status,
    };
    Ok(created(body, "Reservation created").into_response())
}

pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Response, AppError> {
    state.reservations.cancel(ticket_id).await?;
    Ok(empty_success("Reservation cancelled").into_response())
}

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    checkins::check_in, events::event_availability, health_check,
    reservations::{cancel_reservation, create_reservation}, tickets::refund_ticket,
    webhooks::payment_webhook, AppState,
};

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/reservations", post(create_reservation))
        .route("/api/reservations/:ticket_id", delete(cancel_reservation))
        .route("/api/webhooks/payment", post(payment_webhook))
        .route("/api/checkins", post(check_in))
        .route("/api/tickets/:ticket_id/refund", post(refund_ticket))
        .route("/api/events/:event_id/availability", get(event_availability))
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::codes::CodeGenerator;
use crate::config::Config;
use crate::notify::HolderNotifier;
use crate::services::{
    PaymentReconciler, PayoutScheduler, RefundService, ReservationService, VerificationService,
};
use crate::store::TicketStore;
use crate::utils::response::success;

pub mod checkins;
pub mod events;
pub mod reservations;
pub mod tickets;
pub mod webhooks;

/// Dependency-injected handles for every request handler and background job.
/// There are no process-wide singletons; tests assemble the same state over
/// the in-memory store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TicketStore>,
    pub reservations: Arc<ReservationService>,
    pub reconciler: Arc<PaymentReconciler>,
    pub verification: Arc<VerificationService>,
    pub refunds: Arc<RefundService>,
    pub payouts: Arc<PayoutScheduler>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TicketStore>,
        notifier: Arc<dyn HolderNotifier>,
        config: &Config,
    ) -> Self {
        Self {
            reservations: Arc::new(ReservationService::new(
                store.clone(),
                config.reservation_ttl_minutes,
            )),
            reconciler: Arc::new(PaymentReconciler::new(
                store.clone(),
                notifier,
                CodeGenerator::new(config.ticket_code_secret.clone()),
                config.payment_webhook_secret.clone(),
                config.payout_hold_days,
            )),
            verification: Arc::new(VerificationService::new(store.clone())),
            refunds: Arc::new(RefundService::new(store.clone())),
            payouts: Arc::new(PayoutScheduler::new(
                store.clone(),
                config.refund_rate_threshold,
            )),
            store,
        }
    }
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "tessera-api",
    };

    success(payload, "Health check successful").into_response()
}

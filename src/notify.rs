//! Holder-facing notification collaborator.
//!
//! The core only guarantees the confirmation hand-off happens once per
//! successful reconciliation; duplicate webhook deliveries no-op before
//! reaching it. Delivery itself (email, in-app) lives outside this service.

use async_trait::async_trait;

use crate::models::Ticket;

#[async_trait]
pub trait HolderNotifier: Send + Sync {
    /// Called exactly once per ticket, after its payment is confirmed and the
    /// code is attached.
    async fn ticket_confirmed(&self, ticket: &Ticket);
}

/// Development notifier: logs the confirmation instead of delivering it.
pub struct TracingNotifier;

#[async_trait]
impl HolderNotifier for TracingNotifier {
    async fn ticket_confirmed(&self, ticket: &Ticket) {
        tracing::info!(
            ticket_id = %ticket.id,
            holder_email = %ticket.holder_email,
            "Ticket confirmed, notification handed off"
        );
    }
}

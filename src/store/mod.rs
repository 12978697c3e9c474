//! The ticket store: single writer of truth for events, templates, tickets,
//! and payouts.
//!
//! Every state transition the lifecycle needs is a conditional update here —
//! the `bool` returns report whether the compare-and-set matched. Callers
//! never read-then-write; a `false` means another path already moved the
//! record on. Quantity accounting is transactional with the ticket write that
//! causes it, so `available + reserved + sold == total` holds at every
//! observable point.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryTicketStore;
pub use postgres::PgTicketStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, Payout, Ticket, TicketTemplate};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested template has no units left.
    #[error("no inventory available")]
    InventoryExhausted,

    /// A uniqueness rule rejected the write (duplicate session reference, or
    /// a second in-flight reservation for the same buyer and event).
    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Refund pressure for one event, used by the payout disqualification check.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefundStats {
    /// Tickets in the `refunded` terminal state.
    pub refunded: i64,
    /// Tickets whose payment was ever confirmed.
    pub settled: i64,
}

impl RefundStats {
    pub fn rate(&self) -> f64 {
        if self.settled == 0 {
            0.0
        } else {
            self.refunded as f64 / self.settled as f64
        }
    }
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    // ── Events ──────────────────────────────────────────────────────────

    async fn insert_event(&self, event: &Event) -> Result<(), StoreError>;

    async fn event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    /// Recomputes the event's attendee count from the authoritative count of
    /// paid tickets. Recomputed, not incremented, so webhook retries cannot
    /// drift it. Returns the new count.
    async fn refresh_attendee_count(&self, event_id: Uuid) -> Result<i64, StoreError>;

    async fn refund_stats(&self, event_id: Uuid) -> Result<RefundStats, StoreError>;

    // ── Ticket templates ────────────────────────────────────────────────

    async fn insert_template(&self, template: &TicketTemplate) -> Result<(), StoreError>;

    async fn template(&self, id: Uuid) -> Result<Option<TicketTemplate>, StoreError>;

    async fn templates_for_event(&self, event_id: Uuid)
        -> Result<Vec<TicketTemplate>, StoreError>;

    // ── Tickets ─────────────────────────────────────────────────────────

    /// Atomically holds one inventory unit (available -> reserved, only if
    /// `quantity_available > 0`) and inserts the pending ticket. Fails with
    /// [`StoreError::InventoryExhausted`] when sold out and
    /// [`StoreError::Conflict`] when the session reference is taken or the
    /// buyer already has a pending reservation for the event.
    async fn reserve_ticket(&self, ticket: &Ticket) -> Result<(), StoreError>;

    async fn ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError>;

    async fn ticket_by_session(&self, session_reference: &str)
        -> Result<Option<Ticket>, StoreError>;

    async fn ticket_by_code(&self, code: &str) -> Result<Option<Ticket>, StoreError>;

    /// The reconciler's fallback lookup for notifications that raced ahead of
    /// the reservation write.
    async fn pending_ticket_for_buyer(
        &self,
        buyer_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Ticket>, StoreError>;

    /// `payment_status: pending -> paid`, attaching the code and payment
    /// reference and moving the inventory unit reserved -> sold. Returns
    /// `false` when the ticket was not pending (already paid, failed, or
    /// expired) — nothing is written in that case.
    async fn confirm_payment(
        &self,
        ticket_id: Uuid,
        code: &str,
        payment_reference: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// `payment_status: pending -> failed`, `status -> cancelled`, unit
    /// reserved -> available.
    async fn fail_payment(&self, ticket_id: Uuid) -> Result<bool, StoreError>;

    /// Explicit pre-payment cancellation; same accounting as a failed
    /// payment.
    async fn cancel_pending(&self, ticket_id: Uuid) -> Result<bool, StoreError>;

    /// Sweeps reservations created before `cutoff` that never received a
    /// payment outcome: `status -> expired`, `payment_status -> failed`, unit
    /// reserved -> available. Returns the swept tickets. Idempotent — an
    /// already-swept ticket no longer matches.
    async fn expire_pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, StoreError>;

    /// `status: valid -> used` for a paid ticket. The conditional update is
    /// what makes concurrent check-ins yield exactly one grant.
    async fn consume_ticket(
        &self,
        ticket_id: Uuid,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// `status: valid -> refunded` for a paid ticket. Sold inventory is not
    /// restocked.
    async fn refund_ticket(&self, ticket_id: Uuid) -> Result<bool, StoreError>;

    // ── Payouts ─────────────────────────────────────────────────────────

    /// Creates the event's payout row on first call and accumulates `amount`
    /// on every call. Funds stay held until the sweep releases them.
    async fn accrue_payout(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        amount: Decimal,
        hold_until: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn payout_for_event(&self, event_id: Uuid) -> Result<Option<Payout>, StoreError>;

    async fn due_payouts(&self, now: DateTime<Utc>) -> Result<Vec<Payout>, StoreError>;

    /// `status: pending -> released`, recording the transfer reference.
    async fn release_payout(&self, payout_id: Uuid, reference: &str)
        -> Result<bool, StoreError>;
}

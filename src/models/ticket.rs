use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TicketStatus {
    Valid,
    Used,
    Cancelled,
    Refunded,
    Expired,
}

impl TicketStatus {
    /// Terminal states permit no further transition.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Valid)
    }
}

/// One ticket per reservation. Created pending and codeless by the
/// reservation service; the reconciler sets `payment_status` and attaches the
/// code; the verification service consumes it (`status -> used`).
///
/// Invariants: `status == used` implies `payment_status == paid`; a code is
/// present iff the ticket is paid; the code is immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub template_id: Uuid,
    pub buyer_id: Uuid,
    pub holder_name: String,
    pub holder_email: String,
    pub price_paid: Decimal,
    pub payment_status: PaymentStatus,
    pub status: TicketStatus,
    pub code: Option<String>,
    pub checkout_session_reference: String,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub used_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn is_admissible(&self) -> bool {
        self.status == TicketStatus::Valid && self.payment_status == PaymentStatus::Paid
    }
}

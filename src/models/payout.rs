use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Released,
    Failed,
}

/// Held organizer funds, one row per event. Created on the event's first paid
/// ticket; the amount accumulates per confirmed ticket. Released by the
/// payout sweep once `hold_until` has elapsed and no disqualifying signal
/// (refund spike, dispute flag) is present.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payout {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub event_id: Uuid,
    pub amount: Decimal,
    pub status: PayoutStatus,
    pub hold_until: DateTime<Utc>,
    pub release_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

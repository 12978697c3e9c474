use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TicketKind {
    General,
    Vip,
    EarlyBird,
    DayPass,
    MultiDay,
    Backstage,
    Student,
    Group,
}

/// Per-event ticket inventory. A reservation moves one unit
/// available -> reserved; payment confirmation moves it reserved -> sold;
/// expiry, failure, or pre-payment cancellation moves it reserved -> available.
///
/// Invariant: `quantity_available + quantity_reserved + quantity_sold ==
/// quantity_total`, every counter non-negative. Counters are only mutated
/// through the store's hold/finalize/release operations.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketTemplate {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub kind: TicketKind,
    pub unit_price: Decimal,
    pub quantity_total: i32,
    pub quantity_available: i32,
    pub quantity_reserved: i32,
    pub quantity_sold: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketTemplate {
    pub fn quantities_conserved(&self) -> bool {
        self.quantity_available >= 0
            && self.quantity_reserved >= 0
            && self.quantity_sold >= 0
            && self.quantity_available + self.quantity_reserved + self.quantity_sold
                == self.quantity_total
    }
}

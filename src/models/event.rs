use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Recomputed from the count of paid tickets, never incremented in place.
    pub attendee_count: i64,
    /// Set by operators on a chargeback or dispute; blocks payout release.
    pub disputed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// The moment the event is over, used as the payout hold anchor.
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.end_time.unwrap_or(self.start_time)
    }
}

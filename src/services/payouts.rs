//! Organizer fund release.
//!
//! Funds accrue held while tickets sell; the sweep releases a payout only
//! after its hold window has elapsed and no disqualifying signal is present.
//! Disqualified payouts stay pending and are surfaced for manual review —
//! release is never automatic under a refund spike or an open dispute.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Payout, PayoutStatus};
use crate::store::TicketStore;
use crate::utils::error::AppError;

pub struct PayoutScheduler {
    store: Arc<dyn TicketStore>,
    refund_rate_threshold: f64,
}

impl PayoutScheduler {
    pub fn new(store: Arc<dyn TicketStore>, refund_rate_threshold: f64) -> Self {
        Self {
            store,
            refund_rate_threshold,
        }
    }

    /// Releases every due, qualified payout. Safe to run concurrently with
    /// live traffic and with itself; the conditional release makes a
    /// re-sweep of an already-released payout a no-op.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<Payout>, AppError> {
        let due = self.store.due_payouts(now).await?;
        let mut released = Vec::new();

        for mut payout in due {
            let Some(event) = self.store.event(payout.event_id).await? else {
                tracing::warn!(
                    payout_id = %payout.id,
                    event_id = %payout.event_id,
                    "Due payout references an unknown event, held for manual review"
                );
                continue;
            };

            if event.disputed {
                tracing::warn!(
                    payout_id = %payout.id,
                    event_id = %event.id,
                    "Payout held for manual review: event dispute flag set"
                );
                continue;
            }

            let stats = self.store.refund_stats(payout.event_id).await?;
            if stats.rate() > self.refund_rate_threshold {
                tracing::warn!(
                    payout_id = %payout.id,
                    event_id = %event.id,
                    refund_rate = stats.rate(),
                    "Payout held for manual review: refund rate above threshold"
                );
                continue;
            }

            let reference = format!("po_{}", Uuid::new_v4().simple());
            if self.store.release_payout(payout.id, &reference).await? {
                tracing::info!(
                    payout_id = %payout.id,
                    organizer_id = %payout.organizer_id,
                    amount = %payout.amount,
                    reference = %reference,
                    "Payout released"
                );
                payout.status = PayoutStatus::Released;
                payout.release_reference = Some(reference);
                released.push(payout);
            }
        }

        Ok(released)
    }
}

//! Refunds.
//!
//! The only reversal in the lifecycle, and an explicit operation rather than
//! a state-machine transition: full refund seven or more days before the
//! event, half within three to seven days, none closer than three days. The
//! payout hold window exists so this schedule fully elapses before organizer
//! funds leave the platform.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::store::TicketStore;
use crate::utils::error::AppError;

/// Fraction of the ticket price returned for a refund requested at `now`.
pub fn refund_fraction(event_start: DateTime<Utc>, now: DateTime<Utc>) -> Decimal {
    let lead = event_start - now;
    if lead >= Duration::days(7) {
        Decimal::ONE
    } else if lead >= Duration::days(3) {
        Decimal::new(50, 2)
    } else {
        Decimal::ZERO
    }
}

pub struct RefundService {
    store: Arc<dyn TicketStore>,
}

impl RefundService {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Moves a paid, unused ticket into the `refunded` terminal state and
    /// returns the refunded amount. Sold inventory is not restocked.
    pub async fn refund(&self, ticket_id: Uuid, now: DateTime<Utc>) -> Result<Decimal, AppError> {
        let ticket = self
            .store
            .ticket(ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Ticket {ticket_id} not found")))?;
        let event = self
            .store
            .event(ticket.event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", ticket.event_id)))?;

        let fraction = refund_fraction(event.start_time, now);
        if fraction.is_zero() {
            return Err(AppError::ValidationError(
                "Refund window has closed for this event".to_string(),
            ));
        }

        if !self.store.refund_ticket(ticket.id).await? {
            return Err(AppError::TicketInvalid);
        }

        let amount = (ticket.price_paid * fraction).round_dp(2);
        tracing::info!(
            ticket_id = %ticket.id,
            event_id = %event.id,
            amount = %amount,
            "Ticket refunded"
        );
        Ok(amount)
    }
}

//! Door check-in.
//!
//! A scanned code, an image-derived code, and a manually typed ticket id all
//! converge on the same lookup and the same conditional `valid -> used`
//! update, so concurrent scans of one physical ticket produce exactly one
//! grant. Invalid outcomes are deliberately uniform towards the verifier —
//! they never reveal whether a ticket exists.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::TicketStatus;
use crate::store::TicketStore;
use crate::utils::error::AppError;

#[derive(Debug, Clone)]
pub struct CheckInRequest {
    pub code: Option<String>,
    pub manual_id: Option<Uuid>,
    pub event_id: Uuid,
    pub verifier_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Granted {
        holder_name: String,
        ticket_type_name: String,
        used_at: DateTime<Utc>,
    },
    /// The ticket was already consumed; carries the original check-in time.
    Duplicate { used_at: Option<DateTime<Utc>> },
    /// Not found, wrong event, unpaid, or in a terminal state — one uniform
    /// answer for all of them.
    Invalid,
}

pub struct VerificationService {
    store: Arc<dyn TicketStore>,
}

impl VerificationService {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    pub async fn verify(
        &self,
        request: CheckInRequest,
    ) -> Result<VerificationOutcome, AppError> {
        let ticket = match (&request.code, request.manual_id) {
            (Some(code), _) => self.store.ticket_by_code(code).await?,
            (None, Some(id)) => self.store.ticket(id).await?,
            (None, None) => {
                return Err(AppError::ValidationError(
                    "A code or a manual ticket id is required".to_string(),
                ))
            }
        };

        let Some(ticket) = ticket else {
            tracing::info!(
                event_id = %request.event_id,
                verifier_id = %request.verifier_id,
                "Check-in rejected: no matching ticket"
            );
            return Ok(VerificationOutcome::Invalid);
        };

        if ticket.event_id != request.event_id {
            tracing::info!(
                ticket_id = %ticket.id,
                presented_event = %request.event_id,
                ticket_event = %ticket.event_id,
                verifier_id = %request.verifier_id,
                "Check-in rejected: cross-event use"
            );
            return Ok(VerificationOutcome::Invalid);
        }

        if ticket.status == TicketStatus::Used {
            return Ok(VerificationOutcome::Duplicate {
                used_at: ticket.used_at,
            });
        }
        if !ticket.is_admissible() {
            tracing::info!(
                ticket_id = %ticket.id,
                status = ?ticket.status,
                payment_status = ?ticket.payment_status,
                verifier_id = %request.verifier_id,
                "Check-in rejected: ticket not admissible"
            );
            return Ok(VerificationOutcome::Invalid);
        }

        let used_at = Utc::now();
        if self.store.consume_ticket(ticket.id, used_at).await? {
            let ticket_type_name = self
                .store
                .template(ticket.template_id)
                .await?
                .map(|t| t.name)
                .unwrap_or_default();

            tracing::info!(
                ticket_id = %ticket.id,
                event_id = %ticket.event_id,
                verifier_id = %request.verifier_id,
                "Entry granted"
            );
            return Ok(VerificationOutcome::Granted {
                holder_name: ticket.holder_name,
                ticket_type_name,
                used_at,
            });
        }

        // The conditional update did not match: a concurrent scan won, or
        // the ticket left the valid state in between. Re-read to answer.
        match self.store.ticket(ticket.id).await? {
            Some(current) if current.status == TicketStatus::Used => {
                Ok(VerificationOutcome::Duplicate {
                    used_at: current.used_at,
                })
            }
            _ => Ok(VerificationOutcome::Invalid),
        }
    }
}

//! Provisional reservations.
//!
//! A reservation is a pending, codeless ticket holding one inventory unit.
//! The hold is visible to other buyers immediately; it is given back when the
//! payment fails, the buyer cancels, or the checkout TTL elapses without a
//! payment outcome (the expiry sweep is the system's only timeout-driven
//! cancellation path).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{PaymentStatus, Ticket, TicketStatus};
use crate::store::TicketStore;
use crate::utils::error::AppError;

#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub template_id: Uuid,
    pub buyer_id: Uuid,
    pub holder_name: String,
    pub holder_email: String,
    /// Supplied by the checkout caller; correlates the asynchronous payment
    /// notification back to this reservation.
    pub checkout_session_reference: String,
}

pub struct ReservationService {
    store: Arc<dyn TicketStore>,
    ttl: Duration,
}

impl ReservationService {
    pub fn new(store: Arc<dyn TicketStore>, ttl_minutes: i64) -> Self {
        Self {
            store,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub async fn reserve(&self, request: ReserveRequest) -> Result<Ticket, AppError> {
        if request.holder_name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Holder name must not be empty".to_string(),
            ));
        }
        if !request.holder_email.contains('@') {
            return Err(AppError::ValidationError(
                "Holder email is not valid".to_string(),
            ));
        }
        if request.checkout_session_reference.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Checkout session reference must not be empty".to_string(),
            ));
        }

        let template = self
            .store
            .template(request.template_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Ticket template {} not found", request.template_id))
            })?;

        let ticket = Ticket {
            id: Uuid::new_v4(),
            event_id: template.event_id,
            template_id: template.id,
            buyer_id: request.buyer_id,
            holder_name: request.holder_name,
            holder_email: request.holder_email,
            price_paid: template.unit_price,
            payment_status: PaymentStatus::Pending,
            status: TicketStatus::Valid,
            code: None,
            checkout_session_reference: request.checkout_session_reference,
            payment_reference: None,
            created_at: Utc::now(),
            paid_at: None,
            used_at: None,
        };

        self.store.reserve_ticket(&ticket).await?;

        tracing::info!(
            ticket_id = %ticket.id,
            template_id = %template.id,
            buyer_id = %ticket.buyer_id,
            "Reservation created"
        );
        Ok(ticket)
    }

    /// Explicit cancellation before payment; restocks the held unit.
    pub async fn cancel(&self, ticket_id: Uuid) -> Result<(), AppError> {
        if self
            .store
            .ticket(ticket_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!("Ticket {ticket_id} not found")));
        }

        if self.store.cancel_pending(ticket_id).await? {
            tracing::info!(ticket_id = %ticket_id, "Reservation cancelled");
            Ok(())
        } else {
            Err(AppError::TicketInvalid)
        }
    }

    /// Sweeps reservations whose checkout TTL elapsed without a payment
    /// outcome. Returns how many were released.
    pub async fn release_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let expired = self.store.expire_pending_before(now - self.ttl).await?;
        for ticket in &expired {
            tracing::info!(
                ticket_id = %ticket.id,
                template_id = %ticket.template_id,
                "Unconfirmed reservation expired, inventory restored"
            );
        }
        Ok(expired.len())
    }
}

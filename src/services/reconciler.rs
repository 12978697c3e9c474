//! Payment event reconciliation.
//!
//! The processor delivers payment outcomes out-of-band and at-least-once: the
//! same notification can arrive twice, and it can arrive before the
//! reservation's write is visible. Every transition here is a conditional
//! store update, so duplicate deliveries converge on the same end state, and
//! an unmatched session reference falls back to the buyer+event match instead
//! of relying on timing.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::codes::CodeGenerator;
use crate::models::{PaymentStatus, Ticket};
use crate::notify::HolderNotifier;
use crate::signature::verify_signature;
use crate::store::TicketStore;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PaymentEventType {
    #[serde(rename = "payment.succeeded")]
    Succeeded,
    #[serde(rename = "payment.failed")]
    Failed,
}

/// The processor's notification contract.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    pub event_type: PaymentEventType,
    pub checkout_session_reference: String,
    pub buyer_reference: Uuid,
    pub event_reference: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payment_reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The ticket transitioned to paid; code attached, counters moved,
    /// holder notified.
    Confirmed { ticket_id: Uuid },
    /// Duplicate delivery of an outcome that already landed. Nothing written.
    AlreadyProcessed { ticket_id: Uuid },
    /// The payment failed; the reservation was cancelled and restocked.
    PaymentFailed { ticket_id: Uuid },
    /// No ticket matched, even through the fallback. Logged for operators;
    /// acknowledged to the processor so it stops redelivering.
    Orphaned,
}

pub struct PaymentReconciler {
    store: Arc<dyn TicketStore>,
    notifier: Arc<dyn HolderNotifier>,
    codes: CodeGenerator,
    webhook_secret: String,
    payout_hold: Duration,
}

impl PaymentReconciler {
    pub fn new(
        store: Arc<dyn TicketStore>,
        notifier: Arc<dyn HolderNotifier>,
        codes: CodeGenerator,
        webhook_secret: String,
        payout_hold_days: i64,
    ) -> Self {
        Self {
            store,
            notifier,
            codes,
            webhook_secret,
            payout_hold: Duration::days(payout_hold_days),
        }
    }

    /// Authenticates and parses a raw webhook delivery, then reconciles it.
    /// Signature failures reject the notification before anything is read
    /// from the store.
    pub async fn reconcile_raw(
        &self,
        body: &str,
        signature_header: &str,
    ) -> Result<ReconcileOutcome, AppError> {
        verify_signature(
            &self.webhook_secret,
            body,
            signature_header,
            Utc::now().timestamp(),
        )
        .map_err(|e| AppError::AuthenticationFailed(e.to_string()))?;

        let notification: PaymentNotification = serde_json::from_str(body)
            .map_err(|e| AppError::ValidationError(format!("Malformed notification: {e}")))?;

        self.reconcile(notification).await
    }

    pub async fn reconcile(
        &self,
        notification: PaymentNotification,
    ) -> Result<ReconcileOutcome, AppError> {
        let ticket = match self
            .store
            .ticket_by_session(&notification.checkout_session_reference)
            .await?
        {
            Some(ticket) => ticket,
            None => {
                // The notification can outrun the reservation write. Fall
                // back to the buyer+event match; at most one pending ticket
                // can exist for that pair.
                match self
                    .store
                    .pending_ticket_for_buyer(
                        notification.buyer_reference,
                        notification.event_reference,
                    )
                    .await?
                {
                    Some(ticket) => {
                        tracing::warn!(
                            session = %notification.checkout_session_reference,
                            buyer_id = %notification.buyer_reference,
                            event_id = %notification.event_reference,
                            ticket_id = %ticket.id,
                            "Session reference unmatched, reconciled via buyer+event fallback"
                        );
                        ticket
                    }
                    None => {
                        tracing::error!(
                            session = %notification.checkout_session_reference,
                            buyer_id = %notification.buyer_reference,
                            event_id = %notification.event_reference,
                            "Reconciliation orphan: no ticket matches notification"
                        );
                        return Ok(ReconcileOutcome::Orphaned);
                    }
                }
            }
        };

        match notification.event_type {
            PaymentEventType::Succeeded => self.confirm(ticket, &notification).await,
            PaymentEventType::Failed => self.fail(ticket).await,
        }
    }

    async fn confirm(
        &self,
        ticket: Ticket,
        notification: &PaymentNotification,
    ) -> Result<ReconcileOutcome, AppError> {
        if ticket.payment_status == PaymentStatus::Paid {
            tracing::info!(
                ticket_id = %ticket.id,
                "Duplicate success notification, already reconciled"
            );
            return Ok(ReconcileOutcome::AlreadyProcessed {
                ticket_id: ticket.id,
            });
        }

        if notification.amount != ticket.price_paid {
            tracing::warn!(
                ticket_id = %ticket.id,
                expected = %ticket.price_paid,
                received = %notification.amount,
                currency = %notification.currency,
                "Notification amount differs from reserved price"
            );
        }

        // Same inputs, same code — retries cannot mint a second one.
        let code = self
            .codes
            .generate(ticket.id, ticket.event_id, ticket.buyer_id);
        let paid_at = Utc::now();

        let confirmed = self
            .store
            .confirm_payment(ticket.id, &code, &notification.payment_reference, paid_at)
            .await?;

        if !confirmed {
            // Lost the race against a concurrent delivery, or the
            // reservation left the pending state (expired, cancelled) before
            // the notification landed.
            return match self.store.ticket(ticket.id).await? {
                Some(current) if current.payment_status == PaymentStatus::Paid => {
                    Ok(ReconcileOutcome::AlreadyProcessed {
                        ticket_id: ticket.id,
                    })
                }
                _ => {
                    tracing::error!(
                        ticket_id = %ticket.id,
                        session = %notification.checkout_session_reference,
                        "Success notification for a ticket that is no longer payable"
                    );
                    Ok(ReconcileOutcome::Orphaned)
                }
            };
        }

        let attendees = self.store.refresh_attendee_count(ticket.event_id).await?;

        match self.store.event(ticket.event_id).await? {
            Some(event) => {
                let hold_until = event.ends_at() + self.payout_hold;
                self.store
                    .accrue_payout(event.organizer_id, event.id, ticket.price_paid, hold_until)
                    .await?;
            }
            None => {
                tracing::warn!(
                    event_id = %ticket.event_id,
                    "Paid ticket references an unknown event, payout not accrued"
                );
            }
        }

        let mut confirmed_ticket = ticket;
        confirmed_ticket.payment_status = PaymentStatus::Paid;
        confirmed_ticket.code = Some(code);
        confirmed_ticket.payment_reference = Some(notification.payment_reference.clone());
        confirmed_ticket.paid_at = Some(paid_at);

        // Duplicate deliveries no-op before this point, so the hand-off
        // happens once per successful reconciliation.
        self.notifier.ticket_confirmed(&confirmed_ticket).await;

        tracing::info!(
            ticket_id = %confirmed_ticket.id,
            event_id = %confirmed_ticket.event_id,
            attendees,
            "Payment reconciled, ticket issued"
        );
        Ok(ReconcileOutcome::Confirmed {
            ticket_id: confirmed_ticket.id,
        })
    }

    async fn fail(&self, ticket: Ticket) -> Result<ReconcileOutcome, AppError> {
        if self.store.fail_payment(ticket.id).await? {
            tracing::info!(
                ticket_id = %ticket.id,
                "Payment failed, reservation cancelled and inventory restored"
            );
            Ok(ReconcileOutcome::PaymentFailed {
                ticket_id: ticket.id,
            })
        } else {
            Ok(ReconcileOutcome::AlreadyProcessed {
                ticket_id: ticket.id,
            })
        }
    }
}

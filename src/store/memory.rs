//! In-memory ticket store.
//!
//! Mirrors the PostgreSQL store's conditional-update semantics behind a
//! single process-local mutex. Used by tests and local development; it is a
//! stand-in for the durable store, not a cross-process coordination
//! mechanism.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    Event, Payout, PaymentStatus, PayoutStatus, Ticket, TicketStatus, TicketTemplate,
};
use crate::store::{RefundStats, StoreError, TicketStore};

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, Event>,
    templates: HashMap<Uuid, TicketTemplate>,
    tickets: HashMap<Uuid, Ticket>,
    payouts: HashMap<Uuid, Payout>,
}

#[derive(Default)]
pub struct InMemoryTicketStore {
    inner: Mutex<Inner>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn restock_one(templates: &mut HashMap<Uuid, TicketTemplate>, template_id: Uuid) {
    if let Some(template) = templates.get_mut(&template_id) {
        if template.quantity_reserved > 0 {
            template.quantity_reserved -= 1;
            template.quantity_available += 1;
            template.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.events.contains_key(&event.id) {
            return Err(StoreError::Conflict("event already exists".to_string()));
        }
        inner.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.lock().events.get(&id).cloned())
    }

    async fn refresh_attendee_count(&self, event_id: Uuid) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        let count = inner
            .tickets
            .values()
            .filter(|t| t.event_id == event_id && t.payment_status == PaymentStatus::Paid)
            .count() as i64;
        if let Some(event) = inner.events.get_mut(&event_id) {
            event.attendee_count = count;
            event.updated_at = Utc::now();
        }
        Ok(count)
    }

    async fn refund_stats(&self, event_id: Uuid) -> Result<RefundStats, StoreError> {
        let inner = self.lock();
        let mut stats = RefundStats::default();
        for ticket in inner.tickets.values().filter(|t| t.event_id == event_id) {
            if ticket.status == TicketStatus::Refunded {
                stats.refunded += 1;
            }
            if ticket.payment_status == PaymentStatus::Paid {
                stats.settled += 1;
            }
        }
        Ok(stats)
    }

    async fn insert_template(&self, template: &TicketTemplate) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.templates.contains_key(&template.id) {
            return Err(StoreError::Conflict("template already exists".to_string()));
        }
        inner.templates.insert(template.id, template.clone());
        Ok(())
    }

    async fn template(&self, id: Uuid) -> Result<Option<TicketTemplate>, StoreError> {
        Ok(self.lock().templates.get(&id).cloned())
    }

    async fn templates_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<TicketTemplate>, StoreError> {
        let mut templates: Vec<TicketTemplate> = self
            .lock()
            .templates
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn reserve_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut inner = self.lock();

        if inner.tickets.values().any(|t| {
            t.checkout_session_reference == ticket.checkout_session_reference
        }) {
            return Err(StoreError::Conflict(
                "reservation already exists for this buyer or session".to_string(),
            ));
        }
        if inner.tickets.values().any(|t| {
            t.buyer_id == ticket.buyer_id
                && t.event_id == ticket.event_id
                && t.payment_status == PaymentStatus::Pending
        }) {
            return Err(StoreError::Conflict(
                "reservation already exists for this buyer or session".to_string(),
            ));
        }

        let template = inner
            .templates
            .get_mut(&ticket.template_id)
            .ok_or_else(|| StoreError::Conflict("unknown template".to_string()))?;
        if template.quantity_available == 0 {
            return Err(StoreError::InventoryExhausted);
        }
        template.quantity_available -= 1;
        template.quantity_reserved += 1;
        template.updated_at = Utc::now();

        inner.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        Ok(self.lock().tickets.get(&id).cloned())
    }

    async fn ticket_by_session(
        &self,
        session_reference: &str,
    ) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .lock()
            .tickets
            .values()
            .find(|t| t.checkout_session_reference == session_reference)
            .cloned())
    }

    async fn ticket_by_code(&self, code: &str) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .lock()
            .tickets
            .values()
            .find(|t| t.code.as_deref() == Some(code))
            .cloned())
    }

    async fn pending_ticket_for_buyer(
        &self,
        buyer_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Ticket>, StoreError> {
        Ok(self
            .lock()
            .tickets
            .values()
            .find(|t| {
                t.buyer_id == buyer_id
                    && t.event_id == event_id
                    && t.payment_status == PaymentStatus::Pending
            })
            .cloned())
    }

    async fn confirm_payment(
        &self,
        ticket_id: Uuid,
        code: &str,
        payment_reference: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(ticket) = inner.tickets.get_mut(&ticket_id) else {
            return Ok(false);
        };
        if ticket.payment_status != PaymentStatus::Pending
            || ticket.status != TicketStatus::Valid
        {
            return Ok(false);
        }

        ticket.payment_status = PaymentStatus::Paid;
        ticket.code = Some(code.to_string());
        ticket.payment_reference = Some(payment_reference.to_string());
        ticket.paid_at = Some(paid_at);
        let template_id = ticket.template_id;

        if let Some(template) = inner.templates.get_mut(&template_id) {
            if template.quantity_reserved > 0 {
                template.quantity_reserved -= 1;
                template.quantity_sold += 1;
                template.updated_at = Utc::now();
            }
        }
        Ok(true)
    }

    async fn fail_payment(&self, ticket_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(ticket) = inner.tickets.get_mut(&ticket_id) else {
            return Ok(false);
        };
        if ticket.payment_status != PaymentStatus::Pending
            || ticket.status != TicketStatus::Valid
        {
            return Ok(false);
        }

        ticket.payment_status = PaymentStatus::Failed;
        ticket.status = TicketStatus::Cancelled;
        let template_id = ticket.template_id;
        restock_one(&mut inner.templates, template_id);
        Ok(true)
    }

    async fn cancel_pending(&self, ticket_id: Uuid) -> Result<bool, StoreError> {
        self.fail_payment(ticket_id).await
    }

    async fn expire_pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, StoreError> {
        let mut inner = self.lock();
        let stale: Vec<Uuid> = inner
            .tickets
            .values()
            .filter(|t| {
                t.payment_status == PaymentStatus::Pending
                    && t.status == TicketStatus::Valid
                    && t.created_at < cutoff
            })
            .map(|t| t.id)
            .collect();

        let mut expired = Vec::with_capacity(stale.len());
        for id in stale {
            if let Some(ticket) = inner.tickets.get_mut(&id) {
                ticket.status = TicketStatus::Expired;
                ticket.payment_status = PaymentStatus::Failed;
                let snapshot = ticket.clone();
                let template_id = snapshot.template_id;
                restock_one(&mut inner.templates, template_id);
                expired.push(snapshot);
            }
        }
        Ok(expired)
    }

    async fn consume_ticket(
        &self,
        ticket_id: Uuid,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(ticket) = inner.tickets.get_mut(&ticket_id) else {
            return Ok(false);
        };
        if ticket.status != TicketStatus::Valid || ticket.payment_status != PaymentStatus::Paid
        {
            return Ok(false);
        }
        ticket.status = TicketStatus::Used;
        ticket.used_at = Some(used_at);
        Ok(true)
    }

    async fn refund_ticket(&self, ticket_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(ticket) = inner.tickets.get_mut(&ticket_id) else {
            return Ok(false);
        };
        if ticket.status != TicketStatus::Valid || ticket.payment_status != PaymentStatus::Paid
        {
            return Ok(false);
        }
        ticket.status = TicketStatus::Refunded;
        Ok(true)
    }

    async fn accrue_payout(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        amount: Decimal,
        hold_until: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(payout) = inner.payouts.values_mut().find(|p| p.event_id == event_id) {
            payout.amount += amount;
            payout.updated_at = Utc::now();
        } else {
            let now = Utc::now();
            let payout = Payout {
                id: Uuid::new_v4(),
                organizer_id,
                event_id,
                amount,
                status: PayoutStatus::Pending,
                hold_until,
                release_reference: None,
                created_at: now,
                updated_at: now,
            };
            inner.payouts.insert(payout.id, payout);
        }
        Ok(())
    }

    async fn payout_for_event(&self, event_id: Uuid) -> Result<Option<Payout>, StoreError> {
        Ok(self
            .lock()
            .payouts
            .values()
            .find(|p| p.event_id == event_id)
            .cloned())
    }

    async fn due_payouts(&self, now: DateTime<Utc>) -> Result<Vec<Payout>, StoreError> {
        Ok(self
            .lock()
            .payouts
            .values()
            .filter(|p| p.status == PayoutStatus::Pending && p.hold_until <= now)
            .cloned()
            .collect())
    }

    async fn release_payout(
        &self,
        payout_id: Uuid,
        reference: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(payout) = inner.payouts.get_mut(&payout_id) else {
            return Ok(false);
        };
        if payout.status != PayoutStatus::Pending {
            return Ok(false);
        }
        payout.status = PayoutStatus::Released;
        payout.release_reference = Some(reference.to_string());
        payout.updated_at = Utc::now();
        Ok(true)
    }
}

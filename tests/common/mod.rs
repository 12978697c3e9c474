#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use tessera_server::models::{Event, Ticket, TicketKind, TicketTemplate};
use tessera_server::notify::HolderNotifier;
use tessera_server::services::{PaymentEventType, PaymentNotification};
use tessera_server::store::{InMemoryTicketStore, TicketStore};

pub const WEBHOOK_SECRET: &str = "whsec_test123secret456";
pub const CODE_SECRET: &str = "test_code_secret";
pub const TICKET_PRICE_CENTS: i64 = 5000;

pub fn new_store() -> Arc<InMemoryTicketStore> {
    Arc::new(InMemoryTicketStore::new())
}

pub fn as_dyn(store: &Arc<InMemoryTicketStore>) -> Arc<dyn TicketStore> {
    store.clone()
}

/// Notifier double that records each confirmation hand-off.
pub struct RecordingNotifier {
    confirmed: Mutex<Vec<Uuid>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            confirmed: Mutex::new(Vec::new()),
        })
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.lock().unwrap().len()
    }
}

#[async_trait]
impl HolderNotifier for RecordingNotifier {
    async fn ticket_confirmed(&self, ticket: &Ticket) {
        self.confirmed.lock().unwrap().push(ticket.id);
    }
}

pub async fn seed_event(store: &Arc<InMemoryTicketStore>, starts_in_days: i64) -> Event {
    seed_event_with(store, starts_in_days, false).await
}

pub async fn seed_event_with(
    store: &Arc<InMemoryTicketStore>,
    starts_in_days: i64,
    disputed: bool,
) -> Event {
    let now = Utc::now();
    let start = now + Duration::days(starts_in_days);
    let event = Event {
        id: Uuid::new_v4(),
        organizer_id: Uuid::new_v4(),
        title: "Harbor Lights Festival".to_string(),
        location: "Pier 14".to_string(),
        start_time: start,
        end_time: Some(start + Duration::hours(6)),
        attendee_count: 0,
        disputed,
        created_at: now,
        updated_at: now,
    };
    store.insert_event(&event).await.unwrap();
    event
}

pub async fn seed_template(
    store: &Arc<InMemoryTicketStore>,
    event_id: Uuid,
    quantity: i32,
) -> TicketTemplate {
    let now = Utc::now();
    let template = TicketTemplate {
        id: Uuid::new_v4(),
        event_id,
        name: "General Admission".to_string(),
        kind: TicketKind::General,
        unit_price: Decimal::new(TICKET_PRICE_CENTS, 2),
        quantity_total: quantity,
        quantity_available: quantity,
        quantity_reserved: 0,
        quantity_sold: 0,
        created_at: now,
        updated_at: now,
    };
    store.insert_template(&template).await.unwrap();
    template
}

pub fn success_notification(ticket: &Ticket) -> PaymentNotification {
    PaymentNotification {
        event_type: PaymentEventType::Succeeded,
        checkout_session_reference: ticket.checkout_session_reference.clone(),
        buyer_reference: ticket.buyer_id,
        event_reference: ticket.event_id,
        amount: ticket.price_paid,
        currency: "USD".to_string(),
        payment_reference: format!("pay_{}", Uuid::new_v4().simple()),
    }
}

pub fn failure_notification(ticket: &Ticket) -> PaymentNotification {
    PaymentNotification {
        event_type: PaymentEventType::Failed,
        ..success_notification(ticket)
    }
}

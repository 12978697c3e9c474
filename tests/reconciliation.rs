//! Payment reconciliation: idempotent confirmation, the buyer+event fallback
//! for racing notifications, failure restock, orphans, and webhook
//! authentication.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::*;
use tessera_server::codes::CodeGenerator;
use tessera_server::models::{PaymentStatus, TicketStatus};
use tessera_server::services::{
    PaymentReconciler, ReconcileOutcome, ReservationService, ReserveRequest,
};
use tessera_server::signature::sign_payload;
use tessera_server::store::{InMemoryTicketStore, TicketStore};
use tessera_server::utils::error::AppError;

const PAYOUT_HOLD_DAYS: i64 = 7;

fn reconciler(
    store: &Arc<InMemoryTicketStore>,
    notifier: Arc<RecordingNotifier>,
) -> PaymentReconciler {
    PaymentReconciler::new(
        as_dyn(store),
        notifier,
        CodeGenerator::new(CODE_SECRET),
        WEBHOOK_SECRET.to_string(),
        PAYOUT_HOLD_DAYS,
    )
}

async fn reserve(store: &Arc<InMemoryTicketStore>, template_id: Uuid) -> tessera_server::models::Ticket {
    let service = ReservationService::new(as_dyn(store), 30);
    service
        .reserve(ReserveRequest {
            template_id,
            buyer_id: Uuid::new_v4(),
            holder_name: "Ada Holder".to_string(),
            holder_email: "ada@example.com".to_string(),
            checkout_session_reference: format!("cs_{}", Uuid::new_v4().simple()),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_success_notification_issues_coded_ticket() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let template = seed_template(&store, event.id, 5).await;
    let notifier = RecordingNotifier::new();
    let reconciler = reconciler(&store, notifier.clone());

    let ticket = reserve(&store, template.id).await;
    let outcome = reconciler
        .reconcile(success_notification(&ticket))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Confirmed { ticket_id: ticket.id });

    let stored = store.ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert!(stored.paid_at.is_some());
    let code = stored.code.expect("paid ticket carries a code");
    assert!(code.starts_with(&format!("TKT-{}-", ticket.id)));

    let template = store.template(template.id).await.unwrap().unwrap();
    assert_eq!(template.quantity_sold, 1);
    assert_eq!(template.quantity_reserved, 0);
    assert!(template.quantities_conserved());

    let stored_event = store.event(event.id).await.unwrap().unwrap();
    assert_eq!(stored_event.attendee_count, 1);

    let payout = store.payout_for_event(event.id).await.unwrap().unwrap();
    assert_eq!(payout.amount, ticket.price_paid);
    assert_eq!(payout.hold_until, event.ends_at() + Duration::days(PAYOUT_HOLD_DAYS));

    assert_eq!(notifier.confirmed_count(), 1);
}

#[tokio::test]
async fn test_duplicate_success_notification_is_idempotent() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let template = seed_template(&store, event.id, 5).await;
    let notifier = RecordingNotifier::new();
    let reconciler = reconciler(&store, notifier.clone());

    let ticket = reserve(&store, template.id).await;
    let notification = success_notification(&ticket);

    reconciler.reconcile(notification.clone()).await.unwrap();
    let code_after_first = store.ticket(ticket.id).await.unwrap().unwrap().code;

    let outcome = reconciler.reconcile(notification).await.unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::AlreadyProcessed { ticket_id: ticket.id }
    );

    let stored = store.ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.code, code_after_first, "code is never regenerated");

    let template = store.template(template.id).await.unwrap().unwrap();
    assert_eq!(template.quantity_sold, 1, "sold count moves once");

    let stored_event = store.event(event.id).await.unwrap().unwrap();
    assert_eq!(stored_event.attendee_count, 1);

    let payout = store.payout_for_event(event.id).await.unwrap().unwrap();
    assert_eq!(payout.amount, ticket.price_paid, "payout accrues once");

    assert_eq!(notifier.confirmed_count(), 1, "holder is notified once");
}

#[tokio::test]
async fn test_fallback_matches_pending_ticket_by_buyer_and_event() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let template = seed_template(&store, event.id, 5).await;
    let notifier = RecordingNotifier::new();
    let reconciler = reconciler(&store, notifier.clone());

    let ticket = reserve(&store, template.id).await;

    // The notification raced ahead with a session reference the store has
    // never seen; the buyer+event pair still identifies the reservation.
    let mut notification = success_notification(&ticket);
    notification.checkout_session_reference = format!("cs_{}", Uuid::new_v4().simple());

    let outcome = reconciler.reconcile(notification).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Confirmed { ticket_id: ticket.id });

    let stored = store.ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn test_unmatched_notification_is_orphaned() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let template = seed_template(&store, event.id, 5).await;
    let notifier = RecordingNotifier::new();
    let reconciler = reconciler(&store, notifier.clone());

    let ticket = reserve(&store, template.id).await;
    let mut notification = success_notification(&ticket);
    notification.checkout_session_reference = "cs_unknown".to_string();
    notification.buyer_reference = Uuid::new_v4();

    let outcome = reconciler.reconcile(notification).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Orphaned);
    assert_eq!(notifier.confirmed_count(), 0);

    let stored = store.ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Pending, "nothing was written");
}

#[tokio::test]
async fn test_failure_notification_cancels_and_restocks() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let template = seed_template(&store, event.id, 2).await;
    let notifier = RecordingNotifier::new();
    let reconciler = reconciler(&store, notifier.clone());

    let ticket = reserve(&store, template.id).await;
    let outcome = reconciler
        .reconcile(failure_notification(&ticket))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::PaymentFailed { ticket_id: ticket.id });

    let stored = store.ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Failed);
    assert_eq!(stored.status, TicketStatus::Cancelled);
    assert!(stored.code.is_none());

    let template = store.template(template.id).await.unwrap().unwrap();
    assert_eq!(template.quantity_available, 2);
    assert!(template.quantities_conserved());

    // A redelivered failure is a no-op.
    let outcome = reconciler
        .reconcile(failure_notification(&ticket))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ReconcileOutcome::AlreadyProcessed { ticket_id: ticket.id }
    );
    assert_eq!(notifier.confirmed_count(), 0);
}

#[tokio::test]
async fn test_success_after_expiry_is_orphaned_not_granted() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let template = seed_template(&store, event.id, 1).await;
    let notifier = RecordingNotifier::new();
    let reconciler = reconciler(&store, notifier.clone());
    let reservations = ReservationService::new(as_dyn(&store), 30);

    let ticket = reserve(&store, template.id).await;
    reservations
        .release_expired(Utc::now() + Duration::minutes(31))
        .await
        .unwrap();

    // The payment landed after the hold was given back. The money needs a
    // human; the ticket must not be resurrected.
    let outcome = reconciler
        .reconcile(success_notification(&ticket))
        .await
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Orphaned);

    let stored = store.ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Expired);
    assert!(stored.code.is_none());
}

#[tokio::test]
async fn test_raw_webhook_rejects_bad_signature() {
    let store = new_store();
    let notifier = RecordingNotifier::new();
    let reconciler = reconciler(&store, notifier.clone());

    let body = r#"{"eventType":"payment.succeeded","checkoutSessionReference":"cs_x","buyerReference":"1f8e96f2-33cf-44f1-b3c8-f483f1a00000","eventReference":"1f8e96f2-33cf-44f1-b3c8-f483f1a00001","amount":50.0,"currency":"USD","paymentReference":"pay_1"}"#;

    let header = sign_payload("wrong_secret", body, Utc::now().timestamp());
    let err = reconciler.reconcile_raw(body, &header).await.unwrap_err();
    assert!(matches!(err, AppError::AuthenticationFailed(_)));

    // Properly signed, the same body reconciles (to an orphan — the ticket
    // does not exist).
    let header = sign_payload(WEBHOOK_SECRET, body, Utc::now().timestamp());
    let outcome = reconciler.reconcile_raw(body, &header).await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Orphaned);
}

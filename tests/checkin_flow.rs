//! Door verification: single grant under concurrent scanning, cross-event
//! rejection, unpaid and terminal-state tickets, and the manual-id path.

mod common;

use std::sync::Arc;

use uuid::Uuid;

use common::*;
use tessera_server::codes::CodeGenerator;
use tessera_server::models::{Ticket, TicketStatus};
use tessera_server::services::{
    CheckInRequest, PaymentReconciler, ReservationService, ReserveRequest, VerificationOutcome,
    VerificationService,
};
use tessera_server::store::{InMemoryTicketStore, TicketStore};
use tessera_server::utils::error::AppError;

/// Reserves and pays for one ticket, returning it with its code attached.
async fn issued_ticket(store: &Arc<InMemoryTicketStore>, template_id: Uuid) -> Ticket {
    let reservations = ReservationService::new(as_dyn(store), 30);
    let ticket = reservations
        .reserve(ReserveRequest {
            template_id,
            buyer_id: Uuid::new_v4(),
            holder_name: "Ada Holder".to_string(),
            holder_email: "ada@example.com".to_string(),
            checkout_session_reference: format!("cs_{}", Uuid::new_v4().simple()),
        })
        .await
        .unwrap();

    let reconciler = PaymentReconciler::new(
        as_dyn(store),
        RecordingNotifier::new(),
        CodeGenerator::new(CODE_SECRET),
        WEBHOOK_SECRET.to_string(),
        7,
    );
    reconciler
        .reconcile(success_notification(&ticket))
        .await
        .unwrap();

    store.ticket(ticket.id).await.unwrap().unwrap()
}

fn scan(ticket: &Ticket, event_id: Uuid) -> CheckInRequest {
    CheckInRequest {
        code: ticket.code.clone(),
        manual_id: None,
        event_id,
        verifier_id: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn test_scan_grants_entry_once() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let template = seed_template(&store, event.id, 5).await;
    let service = VerificationService::new(as_dyn(&store));

    let ticket = issued_ticket(&store, template.id).await;

    let outcome = service.verify(scan(&ticket, event.id)).await.unwrap();
    let VerificationOutcome::Granted {
        holder_name,
        ticket_type_name,
        used_at,
    } = outcome
    else {
        panic!("expected granted, got {outcome:?}");
    };
    assert_eq!(holder_name, "Ada Holder");
    assert_eq!(ticket_type_name, "General Admission");

    // The second scan reports the original check-in time.
    let outcome = service.verify(scan(&ticket, event.id)).await.unwrap();
    assert_eq!(
        outcome,
        VerificationOutcome::Duplicate {
            used_at: Some(used_at)
        }
    );
}

#[tokio::test]
async fn test_concurrent_scans_yield_one_grant_one_duplicate() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let template = seed_template(&store, event.id, 5).await;
    let service = VerificationService::new(as_dyn(&store));

    let ticket = issued_ticket(&store, template.id).await;

    let (first, second) = tokio::join!(
        service.verify(scan(&ticket, event.id)),
        service.verify(scan(&ticket, event.id)),
    );
    let outcomes = [first.unwrap(), second.unwrap()];

    let grants = outcomes
        .iter()
        .filter(|o| matches!(o, VerificationOutcome::Granted { .. }))
        .count();
    let duplicates = outcomes
        .iter()
        .filter(|o| matches!(o, VerificationOutcome::Duplicate { .. }))
        .count();
    assert_eq!((grants, duplicates), (1, 1));
}

#[tokio::test]
async fn test_cross_event_scan_is_invalid_and_leaves_ticket_untouched() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let other_event = seed_event(&store, 40).await;
    let template = seed_template(&store, event.id, 5).await;
    let service = VerificationService::new(as_dyn(&store));

    let ticket = issued_ticket(&store, template.id).await;

    let outcome = service.verify(scan(&ticket, other_event.id)).await.unwrap();
    assert_eq!(outcome, VerificationOutcome::Invalid);

    let stored = store.ticket(ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Valid, "status unchanged");
    assert!(stored.used_at.is_none());
}

#[tokio::test]
async fn test_unpaid_ticket_is_invalid() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let template = seed_template(&store, event.id, 5).await;
    let service = VerificationService::new(as_dyn(&store));

    let reservations = ReservationService::new(as_dyn(&store), 30);
    let pending = reservations
        .reserve(ReserveRequest {
            template_id: template.id,
            buyer_id: Uuid::new_v4(),
            holder_name: "Ada Holder".to_string(),
            holder_email: "ada@example.com".to_string(),
            checkout_session_reference: format!("cs_{}", Uuid::new_v4().simple()),
        })
        .await
        .unwrap();

    // A pending ticket has no code; the gate falls back to the manual id.
    let outcome = service
        .verify(CheckInRequest {
            code: None,
            manual_id: Some(pending.id),
            event_id: event.id,
            verifier_id: Uuid::new_v4(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, VerificationOutcome::Invalid);
}

#[tokio::test]
async fn test_manual_id_converges_with_code_lookup() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let template = seed_template(&store, event.id, 5).await;
    let service = VerificationService::new(as_dyn(&store));

    let ticket = issued_ticket(&store, template.id).await;

    let outcome = service
        .verify(CheckInRequest {
            code: None,
            manual_id: Some(ticket.id),
            event_id: event.id,
            verifier_id: Uuid::new_v4(),
        })
        .await
        .unwrap();
    assert!(matches!(outcome, VerificationOutcome::Granted { .. }));
}

#[tokio::test]
async fn test_unknown_code_is_invalid_not_distinguished() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let service = VerificationService::new(as_dyn(&store));

    let outcome = service
        .verify(CheckInRequest {
            code: Some("TKT-forged-000000000000".to_string()),
            manual_id: None,
            event_id: event.id,
            verifier_id: Uuid::new_v4(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, VerificationOutcome::Invalid);
}

#[tokio::test]
async fn test_missing_code_and_id_is_a_validation_error() {
    let store = new_store();
    let event = seed_event(&store, 30).await;
    let service = VerificationService::new(as_dyn(&store));

    let err = service
        .verify(CheckInRequest {
            code: None,
            manual_id: None,
            event_id: event.id,
            verifier_id: Uuid::new_v4(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

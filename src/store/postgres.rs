//! PostgreSQL ticket store.
//!
//! Conditional `UPDATE ... WHERE <expected state>` statements carry every
//! state transition; `rows_affected` reports whether the compare-and-set
//! matched. Transitions that touch both a ticket and its template's counters
//! run in one transaction so the quantity invariant never has an observable
//! gap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Event, Payout, Ticket, TicketTemplate};
use crate::store::{RefundStats, StoreError, TicketStore};

#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Moves one unit reserved -> available inside an open transaction.
    async fn restock_one(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        template_id: Uuid,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE ticket_templates
            SET quantity_reserved = quantity_reserved - 1,
                quantity_available = quantity_available + 1,
                updated_at = now()
            WHERE id = $1 AND quantity_reserved > 0
            "#,
        )
        .bind(template_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO events
                (id, organizer_id, title, location, start_time, end_time,
                 attendee_count, disputed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.attendee_count)
        .bind(event.disputed)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn refresh_attendee_count(&self, event_id: Uuid) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            UPDATE events
            SET attendee_count = (
                    SELECT COUNT(*) FROM tickets
                    WHERE event_id = $1 AND payment_status = 'paid'
                ),
                updated_at = now()
            WHERE id = $1
            RETURNING attendee_count
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn refund_stats(&self, event_id: Uuid) -> Result<RefundStats, StoreError> {
        let (refunded, settled): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'refunded'),
                   COUNT(*) FILTER (WHERE payment_status = 'paid')
            FROM tickets
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(RefundStats { refunded, settled })
    }

    async fn insert_template(&self, template: &TicketTemplate) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO ticket_templates
                (id, event_id, name, kind, unit_price, quantity_total,
                 quantity_available, quantity_reserved, quantity_sold,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(template.id)
        .bind(template.event_id)
        .bind(&template.name)
        .bind(template.kind)
        .bind(template.unit_price)
        .bind(template.quantity_total)
        .bind(template.quantity_available)
        .bind(template.quantity_reserved)
        .bind(template.quantity_sold)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn template(&self, id: Uuid) -> Result<Option<TicketTemplate>, StoreError> {
        let template =
            sqlx::query_as::<_, TicketTemplate>("SELECT * FROM ticket_templates WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(template)
    }

    async fn templates_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<TicketTemplate>, StoreError> {
        let templates = sqlx::query_as::<_, TicketTemplate>(
            "SELECT * FROM ticket_templates WHERE event_id = $1 ORDER BY name",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(templates)
    }

    async fn reserve_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let held = sqlx::query(
            r#"
            UPDATE ticket_templates
            SET quantity_available = quantity_available - 1,
                quantity_reserved = quantity_reserved + 1,
                updated_at = now()
            WHERE id = $1 AND quantity_available > 0
            "#,
        )
        .bind(ticket.template_id)
        .execute(&mut *tx)
        .await?;

        if held.rows_affected() == 0 {
            return Err(StoreError::InventoryExhausted);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO tickets
                (id, event_id, template_id, buyer_id, holder_name, holder_email,
                 price_paid, payment_status, status, code,
                 checkout_session_reference, payment_reference,
                 created_at, paid_at, used_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', 'valid', NULL,
                    $8, NULL, $9, NULL, NULL)
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.event_id)
        .bind(ticket.template_id)
        .bind(ticket.buyer_id)
        .bind(&ticket.holder_name)
        .bind(&ticket.holder_email)
        .bind(ticket.price_paid)
        .bind(&ticket.checkout_session_reference)
        .bind(ticket.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            // The partial unique index on (buyer_id, event_id) pending and
            // the unique session reference both surface here.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return Err(StoreError::Conflict(
                        "reservation already exists for this buyer or session".to_string(),
                    ));
                }
            }
            return Err(e.into());
        }

        tx.commit().await?;
        Ok(())
    }

    async fn ticket(&self, id: Uuid) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn ticket_by_session(
        &self,
        session_reference: &str,
    ) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets WHERE checkout_session_reference = $1",
        )
        .bind(session_reference)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn ticket_by_code(&self, code: &str) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn pending_ticket_for_buyer(
        &self,
        buyer_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT * FROM tickets
            WHERE buyer_id = $1 AND event_id = $2 AND payment_status = 'pending'
            "#,
        )
        .bind(buyer_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn confirm_payment(
        &self,
        ticket_id: Uuid,
        code: &str,
        payment_reference: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let confirmed: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE tickets
            SET payment_status = 'paid',
                code = $2,
                payment_reference = $3,
                paid_at = $4
            WHERE id = $1 AND payment_status = 'pending' AND status = 'valid'
            RETURNING template_id
            "#,
        )
        .bind(ticket_id)
        .bind(code)
        .bind(payment_reference)
        .bind(paid_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((template_id,)) = confirmed else {
            return Ok(false);
        };

        sqlx::query(
            r#"
            UPDATE ticket_templates
            SET quantity_reserved = quantity_reserved - 1,
                quantity_sold = quantity_sold + 1,
                updated_at = now()
            WHERE id = $1 AND quantity_reserved > 0
            "#,
        )
        .bind(template_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn fail_payment(&self, ticket_id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let failed: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE tickets
            SET payment_status = 'failed', status = 'cancelled'
            WHERE id = $1 AND payment_status = 'pending' AND status = 'valid'
            RETURNING template_id
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((template_id,)) = failed else {
            return Ok(false);
        };

        Self::restock_one(&mut tx, template_id).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn cancel_pending(&self, ticket_id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let cancelled: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE tickets
            SET payment_status = 'failed', status = 'cancelled'
            WHERE id = $1 AND payment_status = 'pending' AND status = 'valid'
            RETURNING template_id
            "#,
        )
        .bind(ticket_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((template_id,)) = cancelled else {
            return Ok(false);
        };

        Self::restock_one(&mut tx, template_id).await?;
        tx.commit().await?;
        Ok(true)
    }

    async fn expire_pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let expired = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET status = 'expired', payment_status = 'failed'
            WHERE payment_status = 'pending' AND status = 'valid' AND created_at < $1
            RETURNING *
            "#,
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await?;

        for ticket in &expired {
            Self::restock_one(&mut tx, ticket.template_id).await?;
        }

        tx.commit().await?;
        Ok(expired)
    }

    async fn consume_ticket(
        &self,
        ticket_id: Uuid,
        used_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET status = 'used', used_at = $2
            WHERE id = $1 AND status = 'valid' AND payment_status = 'paid'
            "#,
        )
        .bind(ticket_id)
        .bind(used_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn refund_ticket(&self, ticket_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET status = 'refunded'
            WHERE id = $1 AND status = 'valid' AND payment_status = 'paid'
            "#,
        )
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn accrue_payout(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        amount: Decimal,
        hold_until: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payouts
                (id, organizer_id, event_id, amount, status, hold_until)
            VALUES ($1, $2, $3, $4, 'pending', $5)
            ON CONFLICT (event_id) DO UPDATE
            SET amount = payouts.amount + EXCLUDED.amount,
                updated_at = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organizer_id)
        .bind(event_id)
        .bind(amount)
        .bind(hold_until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn payout_for_event(&self, event_id: Uuid) -> Result<Option<Payout>, StoreError> {
        let payout = sqlx::query_as::<_, Payout>("SELECT * FROM payouts WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payout)
    }

    async fn due_payouts(&self, now: DateTime<Utc>) -> Result<Vec<Payout>, StoreError> {
        let payouts = sqlx::query_as::<_, Payout>(
            "SELECT * FROM payouts WHERE status = 'pending' AND hold_until <= $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(payouts)
    }

    async fn release_payout(
        &self,
        payout_id: Uuid,
        reference: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE payouts
            SET status = 'released', release_reference = $2, updated_at = now()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(payout_id)
        .bind(reference)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

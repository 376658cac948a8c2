use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{AccountStore, AdmitOutcome, NewUser, StoreError, TicketStore};
use crate::models::scan::HistoryRow;
use crate::models::ticket::TicketRow;
use crate::models::{CategoryTotal, HistoryEntry, HistoryFilter, ScanStatus, Session, Ticket, User};

const TICKET_COLUMNS: &str =
    "id, code, numero, type, category, image_path, scan_limit, scans_used";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read-only transaction whose statements all see one snapshot, so a
    /// ticket row and its scan rows cannot straddle a concurrent admission.
    async fn snapshot(&self) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

async fn success_timestamps(
    conn: &mut PgConnection,
    ticket_id: i32,
) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT created_at FROM scans WHERE ticket_id = $1 AND status = $2 ORDER BY created_at, id",
    )
    .bind(ticket_id)
    .bind(ScanStatus::Success.as_str())
    .fetch_all(conn)
    .await
}

async fn load_ticket(conn: &mut PgConnection, ticket_id: i32) -> Result<Option<Ticket>, sqlx::Error> {
    let row: Option<TicketRow> =
        sqlx::query_as(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
            .bind(ticket_id)
            .fetch_optional(&mut *conn)
            .await?;

    match row {
        Some(row) => {
            let scans = success_timestamps(conn, row.id).await?;
            Ok(Some(Ticket::from_row(row, scans)))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn find_ticket_by_code(&self, code: &str) -> Result<Option<Ticket>, StoreError> {
        let mut tx = self.snapshot().await?;

        let row: Option<TicketRow> =
            sqlx::query_as(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE code = $1"))
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?;

        let ticket = match row {
            Some(row) => {
                let scans = success_timestamps(&mut tx, row.id).await?;
                Some(Ticket::from_row(row, scans))
            }
            None => None,
        };

        tx.commit().await?;

        Ok(ticket)
    }

    async fn admit(&self, ticket_id: i32) -> Result<AdmitOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The predicate is re-evaluated after waiting on the row lock, so two
        // concurrent scans can never both take the last admission.
        let updated: Option<i32> = sqlx::query_scalar(
            "UPDATE tickets SET scans_used = scans_used + 1 \
             WHERE id = $1 AND scans_used < scan_limit RETURNING id",
        )
        .bind(ticket_id)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            let current = load_ticket(&mut tx, ticket_id).await?;
            tx.rollback().await?;
            return Ok(match current {
                Some(ticket) => AdmitOutcome::Exhausted(ticket),
                None => AdmitOutcome::Vanished,
            });
        }

        sqlx::query("INSERT INTO scans (ticket_id, status) VALUES ($1, $2)")
            .bind(ticket_id)
            .bind(ScanStatus::Success.as_str())
            .execute(&mut *tx)
            .await?;

        let Some(ticket) = load_ticket(&mut tx, ticket_id).await? else {
            tx.rollback().await?;
            return Ok(AdmitOutcome::Vanished);
        };

        tx.commit().await?;

        Ok(AdmitOutcome::Admitted(ticket))
    }

    async fn record_failed_scan(&self, ticket_id: Option<i32>) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO scans (ticket_id, status) VALUES ($1, $2)")
            .bind(ticket_id)
            .bind(ScanStatus::Failed.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn search_history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            "SELECT s.id, s.created_at, s.status, t.numero, t.type AS ticket_type \
             FROM scans s \
             LEFT JOIN tickets t ON t.id = s.ticket_id \
             WHERE ($1::timestamptz IS NULL OR s.created_at >= $1) \
               AND ($2::timestamptz IS NULL OR s.created_at <= $2) \
               AND ($3::text IS NULL OR strpos(lower(t.numero), lower($3)) > 0) \
             ORDER BY s.created_at DESC, s.id DESC \
             LIMIT $4",
        )
        .bind(filter.from)
        .bind(filter.until)
        .bind(filter.numero_contains.as_deref())
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }

    async fn category_totals(&self) -> Result<Vec<CategoryTotal>, StoreError> {
        let totals = sqlx::query_as(
            "SELECT t.type, COUNT(DISTINCT s.ticket_id) AS total \
             FROM scans s \
             JOIN tickets t ON s.ticket_id = t.id \
             WHERE s.status = $1 \
             GROUP BY t.type \
             ORDER BY t.type",
        )
        .bind(ScanStatus::Success.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(totals)
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        let mut tx = self.snapshot().await?;

        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY scans_used DESC, id ASC"
        ))
        .fetch_all(&mut *tx)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let scans: Vec<(i32, DateTime<Utc>)> = sqlx::query_as(
            "SELECT ticket_id, created_at FROM scans \
             WHERE ticket_id = ANY($1) AND status = $2 \
             ORDER BY created_at, id",
        )
        .bind(ids.as_slice())
        .bind(ScanStatus::Success.as_str())
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut by_ticket: HashMap<i32, Vec<DateTime<Utc>>> = HashMap::new();
        for (ticket_id, created_at) in scans {
            by_ticket.entry(ticket_id).or_default().push(created_at);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let scans = by_ticket.remove(&row.id).unwrap_or_default();
                Ticket::from_row(row, scans)
            })
            .collect())
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as(
            "SELECT id, name, email, hashed_password, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as(
            "SELECT id, name, email, hashed_password, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user_if_absent(&self, user: NewUser) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO users (id, email, name, hashed_password) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.hashed_password)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_session(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token_hash)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_active_session(&self, token_hash: &str) -> Result<Option<Session>, StoreError> {
        let session = sqlx::query_as(
            "SELECT token_hash, user_id, created_at, expires_at FROM sessions \
             WHERE token_hash = $1 AND expires_at > NOW()",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

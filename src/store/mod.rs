//! Persistence for tickets, scan events, staff accounts and sessions.
//!
//! Handlers and services only see the [`TicketStore`] and [`AccountStore`]
//! traits. [`PgStore`] backs them with PostgreSQL; [`MemoryStore`] keeps
//! everything in process and is what the integration tests run against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CategoryTotal, HistoryEntry, HistoryFilter, Session, Ticket, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of the atomic increment-and-log unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// Counter incremented and success event written. Holds the re-read ticket.
    Admitted(Ticket),
    /// A concurrent scan used the last admission first. Nothing was written.
    Exhausted(Ticket),
    /// The ticket disappeared before the update. Nothing was written.
    Vanished,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub hashed_password: String,
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Exact-match lookup by QR payload, with the ticket's success timestamps.
    async fn find_ticket_by_code(&self, code: &str) -> Result<Option<Ticket>, StoreError>;

    /// Increment `scans_used`, insert a success event and re-read the ticket,
    /// all or nothing. Never lets `scans_used` exceed `scan_limit`.
    async fn admit(&self, ticket_id: i32) -> Result<AdmitOutcome, StoreError>;

    /// Log a failed scan attempt, optionally against a known ticket.
    async fn record_failed_scan(&self, ticket_id: Option<i32>) -> Result<(), StoreError>;

    /// Matching events, newest first, at most `filter.limit` of them.
    async fn search_history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Distinct tickets with at least one successful scan, per ticket type.
    async fn category_totals(&self) -> Result<Vec<CategoryTotal>, StoreError>;

    /// Every ticket with its scan timestamps, most used first.
    async fn list_tickets(&self) -> Result<Vec<Ticket>, StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Creates the user unless the email is taken. Returns whether a row was inserted.
    async fn create_user_if_absent(&self, user: NewUser) -> Result<bool, StoreError>;

    async fn insert_session(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Returns the session only while it has not expired.
    async fn find_active_session(&self, token_hash: &str) -> Result<Option<Session>, StoreError>;

    async fn delete_session(&self, token_hash: &str) -> Result<(), StoreError>;

    /// Removes expired sessions and returns how many were dropped.
    async fn purge_expired_sessions(&self) -> Result<u64, StoreError>;
}

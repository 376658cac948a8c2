use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AccountStore, AdmitOutcome, NewUser, StoreError, TicketStore};
use crate::models::{
    CategoryTotal, HistoryEntry, HistoryFilter, ScanStatus, Session, Ticket, User,
};
use crate::models::scan::UNKNOWN_LABEL;

/// Ticket fields supplied when provisioning into a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub code: String,
    pub numero: String,
    pub ticket_type: String,
    pub category: Option<String>,
    pub image_path: Option<String>,
    pub scan_limit: i32,
    pub scans_used: i32,
}

impl NewTicket {
    pub fn new(code: &str, numero: &str, ticket_type: &str, scan_limit: i32) -> Self {
        Self {
            code: code.to_string(),
            numero: numero.to_string(),
            ticket_type: ticket_type.to_string(),
            category: None,
            image_path: None,
            scan_limit,
            scans_used: 0,
        }
    }

    pub fn with_scans_used(mut self, scans_used: i32) -> Self {
        self.scans_used = scans_used;
        self
    }
}

#[derive(Debug, Clone)]
pub struct StoredScan {
    pub id: i64,
    pub ticket_id: Option<i32>,
    pub status: ScanStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredTicket {
    id: i32,
    code: String,
    numero: String,
    ticket_type: String,
    category: Option<String>,
    image_path: Option<String>,
    scan_limit: i32,
    scans_used: i32,
}

#[derive(Default)]
struct Inner {
    tickets: Vec<StoredTicket>,
    scans: Vec<StoredScan>,
    users: Vec<User>,
    sessions: HashMap<String, Session>,
    next_scan_id: i64,
}

impl Inner {
    fn ticket_view(&self, ticket: &StoredTicket) -> Ticket {
        let scans = self
            .scans
            .iter()
            .filter(|scan| scan.ticket_id == Some(ticket.id) && scan.status == ScanStatus::Success)
            .map(|scan| scan.created_at)
            .collect();

        Ticket {
            id: ticket.id,
            code: ticket.code.clone(),
            numero: ticket.numero.clone(),
            ticket_type: ticket.ticket_type.clone(),
            category: ticket.category.clone(),
            image_path: ticket.image_path.clone(),
            scan_limit: ticket.scan_limit,
            scans_used: ticket.scans_used,
            scans,
        }
    }

    fn push_scan(&mut self, ticket_id: Option<i32>, status: ScanStatus, created_at: DateTime<Utc>) {
        self.next_scan_id += 1;
        let id = self.next_scan_id;
        self.scans.push(StoredScan {
            id,
            ticket_id,
            status,
            created_at,
        });
    }
}

/// In-process store. One mutex guards all state, so every trait call is
/// atomic with respect to every other, like a serializable transaction.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("storage offline".to_string()));
        }
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    pub fn insert_ticket(&self, ticket: NewTicket) -> Result<i32, StoreError> {
        let mut inner = self.lock()?;
        let id = i32::try_from(inner.tickets.len() + 1)
            .map_err(|_| StoreError::Unavailable("ticket id space exhausted".to_string()))?;
        inner.tickets.push(StoredTicket {
            id,
            code: ticket.code,
            numero: ticket.numero,
            ticket_type: ticket.ticket_type,
            category: ticket.category,
            image_path: ticket.image_path,
            scan_limit: ticket.scan_limit,
            scans_used: ticket.scans_used,
        });
        Ok(id)
    }

    /// Inserts a scan event with an explicit timestamp.
    pub fn insert_scan_at(
        &self,
        ticket_id: Option<i32>,
        status: ScanStatus,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.lock()?.push_scan(ticket_id, status, created_at);
        Ok(())
    }

    pub fn scans(&self) -> Result<Vec<StoredScan>, StoreError> {
        Ok(self.lock()?.scans.clone())
    }

    /// Drops a ticket and its events, simulating an out-of-band deletion.
    pub fn remove_ticket(&self, ticket_id: i32) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.tickets.retain(|ticket| ticket.id != ticket_id);
        inner.scans.retain(|scan| scan.ticket_id != Some(ticket_id));
        Ok(())
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn find_ticket_by_code(&self, code: &str) -> Result<Option<Ticket>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .tickets
            .iter()
            .find(|ticket| ticket.code == code)
            .map(|ticket| inner.ticket_view(ticket)))
    }

    async fn admit(&self, ticket_id: i32) -> Result<AdmitOutcome, StoreError> {
        let mut inner = self.lock()?;

        let Some(position) = inner.tickets.iter().position(|ticket| ticket.id == ticket_id) else {
            return Ok(AdmitOutcome::Vanished);
        };

        if inner.tickets[position].scans_used >= inner.tickets[position].scan_limit {
            let ticket = inner.ticket_view(&inner.tickets[position]);
            return Ok(AdmitOutcome::Exhausted(ticket));
        }

        inner.tickets[position].scans_used += 1;
        inner.push_scan(Some(ticket_id), ScanStatus::Success, Utc::now());

        let ticket = inner.ticket_view(&inner.tickets[position]);
        Ok(AdmitOutcome::Admitted(ticket))
    }

    async fn record_failed_scan(&self, ticket_id: Option<i32>) -> Result<(), StoreError> {
        self.lock()?.push_scan(ticket_id, ScanStatus::Failed, Utc::now());
        Ok(())
    }

    async fn search_history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryEntry>, StoreError> {
        let inner = self.lock()?;
        let needle = filter.numero_contains.as_ref().map(|q| q.to_lowercase());

        let mut matches: Vec<HistoryEntry> = inner
            .scans
            .iter()
            .filter(|scan| filter.from.map_or(true, |from| scan.created_at >= from))
            .filter(|scan| filter.until.map_or(true, |until| scan.created_at <= until))
            .filter_map(|scan| {
                let ticket = scan
                    .ticket_id
                    .and_then(|id| inner.tickets.iter().find(|ticket| ticket.id == id));

                if let Some(needle) = &needle {
                    let numero = ticket?.numero.to_lowercase();
                    if !numero.contains(needle.as_str()) {
                        return None;
                    }
                }

                Some(HistoryEntry {
                    id: scan.id,
                    created_at: scan.created_at,
                    numero: ticket.map_or_else(|| UNKNOWN_LABEL.to_string(), |t| t.numero.clone()),
                    ticket_type: ticket
                        .map_or_else(|| UNKNOWN_LABEL.to_string(), |t| t.ticket_type.clone()),
                    status: scan.status,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matches.truncate(usize::try_from(filter.limit).unwrap_or(0));

        Ok(matches)
    }

    async fn category_totals(&self) -> Result<Vec<CategoryTotal>, StoreError> {
        let inner = self.lock()?;

        let admitted: HashSet<i32> = inner
            .scans
            .iter()
            .filter(|scan| scan.status == ScanStatus::Success)
            .filter_map(|scan| scan.ticket_id)
            .collect();

        let mut per_type: HashMap<String, i64> = HashMap::new();
        for ticket in inner.tickets.iter().filter(|t| admitted.contains(&t.id)) {
            *per_type.entry(ticket.ticket_type.clone()).or_default() += 1;
        }

        let mut totals: Vec<CategoryTotal> = per_type
            .into_iter()
            .map(|(ticket_type, total)| CategoryTotal { ticket_type, total })
            .collect();
        totals.sort_by(|a, b| a.ticket_type.cmp(&b.ticket_type));

        Ok(totals)
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>, StoreError> {
        let inner = self.lock()?;

        let mut tickets: Vec<Ticket> = inner
            .tickets
            .iter()
            .map(|ticket| inner.ticket_view(ticket))
            .collect();
        tickets.sort_by(|a, b| b.scans_used.cmp(&a.scans_used).then(a.id.cmp(&b.id)));

        Ok(tickets)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user_if_absent(&self, user: NewUser) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Ok(false);
        }
        inner.users.push(User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            hashed_password: user.hashed_password,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn insert_session(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.lock()?.sessions.insert(
            token_hash.to_string(),
            Session {
                token_hash: token_hash.to_string(),
                user_id,
                created_at: Utc::now(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn find_active_session(&self, token_hash: &str) -> Result<Option<Session>, StoreError> {
        let now = Utc::now();
        Ok(self
            .lock()?
            .sessions
            .get(token_hash)
            .filter(|session| session.expires_at > now)
            .cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), StoreError> {
        self.lock()?.sessions.remove(token_hash);
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut inner = self.lock()?;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, session| session.expires_at > now);
        Ok((before - inner.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admit_stops_at_limit() {
        let store = MemoryStore::new();
        let id = store
            .insert_ticket(NewTicket::new("QR-1", "A1", "Standard", 2))
            .unwrap();

        assert!(matches!(store.admit(id).await.unwrap(), AdmitOutcome::Admitted(_)));
        assert!(matches!(store.admit(id).await.unwrap(), AdmitOutcome::Admitted(_)));

        match store.admit(id).await.unwrap() {
            AdmitOutcome::Exhausted(ticket) => {
                assert_eq!(ticket.scans_used, 2);
                assert_eq!(ticket.scans.len(), 2);
            }
            other => panic!("expected exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_admit_unknown_ticket_is_vanished() {
        let store = MemoryStore::new();
        assert_eq!(store.admit(42).await.unwrap(), AdmitOutcome::Vanished);
        assert!(store.scans().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_removed_ticket_vanishes() {
        let store = MemoryStore::new();
        let id = store
            .insert_ticket(NewTicket::new("QR-1", "A1", "Standard", 2))
            .unwrap();
        store.admit(id).await.unwrap();

        store.remove_ticket(id).unwrap();

        assert_eq!(store.admit(id).await.unwrap(), AdmitOutcome::Vanished);
        assert!(store.find_ticket_by_code("QR-1").await.unwrap().is_none());
        assert!(store.scans().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_store_reports_unavailable() {
        let store = MemoryStore::new();
        store.set_failing(true);

        let err = store.find_ticket_by_code("QR-1").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_expired_sessions_are_hidden_and_purged() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let past = Utc::now() - chrono::Duration::minutes(1);

        store.insert_session("old", user_id, past).await.unwrap();
        assert!(store.find_active_session("old").await.unwrap().is_none());
        assert_eq!(store.purge_expired_sessions().await.unwrap(), 1);
    }
}

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ScanPolicy};
use crate::store::{AccountStore, TicketStore};

/// Shared by every handler. Cloning is cheap; the stores sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub tickets: Arc<dyn TicketStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub scan_policy: ScanPolicy,
    pub session_ttl: Duration,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, scan_policy: ScanPolicy, session_ttl: Duration) -> Self
    where
        S: TicketStore + AccountStore + 'static,
    {
        Self {
            tickets: store.clone(),
            accounts: store,
            scan_policy,
            session_ttl,
        }
    }

    pub fn from_config<S>(store: Arc<S>, config: &Config) -> Self
    where
        S: TicketStore + AccountStore + 'static,
    {
        Self::new(store, config.scan_policy, config.session_ttl)
    }
}

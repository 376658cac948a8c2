//! Ticket scan validation.
//!
//! A scan is accepted only while `scans_used < scan_limit`. Acceptance is
//! delegated to [`TicketStore::admit`], which increments the counter and logs
//! the success event as one unit; everything before it is read-only apart
//! from the optional failure logging selected by [`ScanPolicy`].

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ScanPolicy;
use crate::models::{Ticket, TicketDetails};
use crate::store::{AdmitOutcome, StoreError, TicketStore};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("QR code is required")]
    MissingCode,

    #[error("Ticket not found")]
    NotFound,

    #[error("This ticket has reached its maximum number of scans")]
    LimitReached(Box<TicketDetails>),

    #[error("Failed to update ticket")]
    UpdateFailed,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Outcome of an accepted scan.
#[derive(Debug, Clone)]
pub struct ScanReceipt {
    pub ticket: Ticket,
    pub remaining: i32,
    pub message: String,
}

/// Kiosk message for the allowance left after an admission.
pub fn remaining_message(remaining: i32) -> String {
    match remaining {
        0 => "Final scan allowed! This ticket can no longer be scanned.".to_string(),
        1 => "1 scan remaining! Use it with care.".to_string(),
        n => format!("{n} scans remaining."),
    }
}

pub async fn scan_ticket(
    store: &dyn TicketStore,
    policy: ScanPolicy,
    code: Option<&str>,
) -> Result<ScanReceipt, ScanError> {
    let code = match code {
        Some(code) if !code.is_empty() => code,
        _ => return Err(ScanError::MissingCode),
    };

    let Some(ticket) = store.find_ticket_by_code(code).await? else {
        info!(code, "Scan of unknown ticket code");
        if policy.log_unknown_codes {
            log_failed_scan(store, None).await;
        }
        return Err(ScanError::NotFound);
    };

    if ticket.remaining() <= 0 {
        return Err(reject(store, policy, ticket).await);
    }

    match store.admit(ticket.id).await? {
        AdmitOutcome::Admitted(ticket) => {
            let remaining = ticket.remaining();
            info!(
                ticket_id = ticket.id,
                numero = %ticket.numero,
                scans_used = ticket.scans_used,
                remaining,
                "Ticket admitted"
            );
            Ok(ScanReceipt {
                message: remaining_message(remaining),
                remaining,
                ticket,
            })
        }
        AdmitOutcome::Exhausted(ticket) => {
            debug!(ticket_id = ticket.id, "Last admission taken by a concurrent scan");
            Err(reject(store, policy, ticket).await)
        }
        AdmitOutcome::Vanished => Err(ScanError::UpdateFailed),
    }
}

async fn reject(store: &dyn TicketStore, policy: ScanPolicy, ticket: Ticket) -> ScanError {
    info!(
        ticket_id = ticket.id,
        numero = %ticket.numero,
        scan_limit = ticket.scan_limit,
        "Scan rejected, limit reached"
    );
    if policy.log_rejected_scans {
        log_failed_scan(store, Some(ticket.id)).await;
    }
    ScanError::LimitReached(Box::new(TicketDetails::from(&ticket)))
}

/// The attempt's outcome is already decided, so a logging failure is only reported.
async fn log_failed_scan(store: &dyn TicketStore, ticket_id: Option<i32>) {
    if let Err(e) = store.record_failed_scan(ticket_id).await {
        warn!(error = ?e, ?ticket_id, "Failed to record failed scan");
    }
}

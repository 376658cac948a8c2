use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::iso8601;

/// A ticket row as stored, without its scan history.
#[derive(Debug, Clone, FromRow)]
pub struct TicketRow {
    pub id: i32,
    pub code: String,
    pub numero: String,
    #[sqlx(rename = "type")]
    pub ticket_type: String,
    pub category: Option<String>,
    pub image_path: Option<String>,
    pub scan_limit: i32,
    pub scans_used: i32,
}

/// A ticket together with the timestamps of its successful scans, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: i32,
    pub code: String,
    pub numero: String,
    pub ticket_type: String,
    pub category: Option<String>,
    pub image_path: Option<String>,
    pub scan_limit: i32,
    pub scans_used: i32,
    pub scans: Vec<DateTime<Utc>>,
}

impl Ticket {
    pub fn from_row(row: TicketRow, scans: Vec<DateTime<Utc>>) -> Self {
        Self {
            id: row.id,
            code: row.code,
            numero: row.numero,
            ticket_type: row.ticket_type,
            category: row.category,
            image_path: row.image_path,
            scan_limit: row.scan_limit,
            scans_used: row.scans_used,
            scans,
        }
    }

    /// Admissions still allowed. Negative only if the row was edited by hand.
    pub fn remaining(&self) -> i32 {
        self.scan_limit - self.scans_used
    }
}

/// Ticket as returned to the scanning kiosk after an admission.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedTicket {
    pub id: i32,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub numero: String,
    pub scan_limit: i32,
    pub scans_used: i32,
    #[serde(serialize_with = "iso8601::serialize_all")]
    pub scans: Vec<DateTime<Utc>>,
}

impl From<&Ticket> for ScannedTicket {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id,
            ticket_type: ticket.ticket_type.clone(),
            numero: ticket.numero.clone(),
            scan_limit: ticket.scan_limit,
            scans_used: ticket.scans_used,
            scans: ticket.scans.clone(),
        }
    }
}

/// Snapshot attached to a rejected scan so staff can see when the ticket was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketDetails {
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub numero: String,
    pub scan_limit: i32,
    pub scans_used: i32,
    #[serde(serialize_with = "iso8601::serialize_all")]
    pub scans: Vec<DateTime<Utc>>,
}

impl From<&Ticket> for TicketDetails {
    fn from(ticket: &Ticket) -> Self {
        Self {
            ticket_type: ticket.ticket_type.clone(),
            numero: ticket.numero.clone(),
            scan_limit: ticket.scan_limit,
            scans_used: ticket.scans_used,
            scans: ticket.scans.clone(),
        }
    }
}

/// Admin listing entry.
#[derive(Debug, Clone, Serialize)]
pub struct TicketListing {
    pub id: i32,
    pub code: String,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub category: Option<String>,
    pub numero: String,
    pub image_path: Option<String>,
    pub scan_limit: i32,
    pub scans_used: i32,
    #[serde(serialize_with = "iso8601::serialize_all")]
    pub scans: Vec<DateTime<Utc>>,
}

impl From<Ticket> for TicketListing {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            code: ticket.code,
            ticket_type: ticket.ticket_type,
            category: ticket.category,
            numero: ticket.numero,
            image_path: ticket.image_path,
            scan_limit: ticket.scan_limit,
            scans_used: ticket.scans_used,
            scans: ticket.scans,
        }
    }
}

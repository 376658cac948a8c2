use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::iso8601;

/// Shown for events whose ticket could not be resolved.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Success,
    Failed,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Success => "success",
            ScanStatus::Failed => "failed",
        }
    }

    /// Anything that is not `success` counts as failed.
    pub fn from_db(value: &str) -> Self {
        if value == "success" {
            ScanStatus::Success
        } else {
            ScanStatus::Failed
        }
    }
}

/// Typed filter for the history search. `None` means "no bound".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub numero_contains: Option<String>,
    pub limit: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub status: String,
    pub numero: Option<String>,
    pub ticket_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(rename = "createdAt", serialize_with = "iso8601::serialize")]
    pub created_at: DateTime<Utc>,
    pub numero: String,
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub status: ScanStatus,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            numero: row.numero.unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            ticket_type: row.ticket_type.unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            status: ScanStatus::from_db(&row.status),
        }
    }
}

/// Distinct admitted tickets for one ticket type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CategoryTotal {
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub ticket_type: String,
    pub total: i64,
}

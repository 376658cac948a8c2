//! Scan history filters.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::models::HistoryFilter;

/// Maximum number of events returned by one history search.
pub const HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Invalid {bound} date: expected YYYY-MM-DD")]
    InvalidDate { bound: &'static str, value: String },

    #[error("Start date must not be after end date")]
    InvalidRange,
}

/// Raw query string of `GET /history`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub q: Option<String>,
}

impl HistoryParams {
    /// Validates the parameters and turns them into a store filter. Empty
    /// values count as absent.
    pub fn into_filter(self) -> Result<HistoryFilter, HistoryError> {
        let start = non_empty(self.start)
            .map(|raw| parse_day("start", raw))
            .transpose()?;
        let end = non_empty(self.end)
            .map(|raw| parse_day("end", raw))
            .transpose()?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(HistoryError::InvalidRange);
            }
        }

        Ok(HistoryFilter {
            from: start.map(start_of_day),
            until: end.map(end_of_day),
            numero_contains: self
                .q
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            limit: HISTORY_LIMIT,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Accepts exactly `YYYY-MM-DD` naming a real calendar day.
fn parse_day(bound: &'static str, raw: String) -> Result<NaiveDate, HistoryError> {
    let shaped = raw.len() == 10
        && raw.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !shaped {
        return Err(HistoryError::InvalidDate { bound, value: raw });
    }

    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| HistoryError::InvalidDate { bound, value: raw })
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Last millisecond of the day, so the end bound is inclusive.
fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    let last_milli = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    day.and_time(last_milli).and_utc()
}

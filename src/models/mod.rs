pub mod scan;
pub mod ticket;
pub mod user;

pub use scan::{CategoryTotal, HistoryEntry, HistoryFilter, ScanStatus};
pub use ticket::{ScannedTicket, Ticket, TicketDetails, TicketListing};
pub use user::{PublicUser, Session, User};

/// Timestamps leave the API as ISO-8601 with millisecond precision, e.g.
/// `2024-01-05T10:00:00.000Z`.
pub(crate) mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::ser::SerializeSeq;
    use serde::Serializer;

    pub fn format(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(at))
    }

    pub fn serialize_all<S: Serializer>(
        all: &[DateTime<Utc>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(all.len()))?;
        for at in all {
            seq.serialize_element(&format(at))?;
        }
        seq.end()
    }

}

//! Server clock offset.
//!
//! `OperationalData` frames carry the server's wall clock. The board keeps
//! `offset = server - local` and shows `local + offset`.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

/// Parse a server timestamp: RFC 3339, or a naive ISO 8601 time taken as UTC.
pub fn parse_server_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ServerClock {
    offset: Option<TimeDelta>,
}

impl ServerClock {
    /// Record a server sample taken at local time `local`. Returns the new
    /// offset in milliseconds.
    pub fn sync_at(&mut self, server: DateTime<Utc>, local: DateTime<Utc>) -> i64 {
        let offset = server - local;
        self.offset = Some(offset);
        offset.num_milliseconds()
    }

    pub fn sync(&mut self, server: DateTime<Utc>) -> i64 {
        self.sync_at(server, Utc::now())
    }

    pub fn offset_ms(&self) -> Option<i64> {
        self.offset.map(|o| o.num_milliseconds())
    }
}

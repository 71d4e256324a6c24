//! `[feed]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [feed]
//! url = "ws://127.0.0.1:8000/ws/bnt/"   # Push feed address (ws only)
//! reconnect_interval_ms = 1000          # Fixed delay between attempts
//! max_attempts = 60                     # Give up after this many retries
//! read_timeout_ms = 50                  # Socket poll interval
//! connect_timeout_ms = 5000             # Bound on TCP connect and upgrade
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ConfigDiagnostics, FieldPath};

/// Push feed connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed address.
    pub url: String,

    /// Delay before each reconnect attempt.
    pub reconnect_interval_ms: u64,

    /// Reconnect attempts before the connection is declared lost.
    pub max_attempts: u32,

    /// Socket read timeout; bounds how long a send or close waits.
    pub read_timeout_ms: u64,

    /// Bound on the TCP connect and the upgrade handshake of one attempt.
    pub connect_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000/ws/bnt/".to_string(),
            reconnect_interval_ms: 1000,
            max_attempts: 60,
            read_timeout_ms: 50,
            connect_timeout_ms: 5000,
        }
    }
}

impl FeedConfig {
    const URL: FieldPath = FieldPath::new("feed.url");
    const MAX_ATTEMPTS: FieldPath = FieldPath::new("feed.max_attempts");
    const READ_TIMEOUT: FieldPath = FieldPath::new("feed.read_timeout_ms");
    const CONNECT_TIMEOUT: FieldPath = FieldPath::new("feed.connect_timeout_ms");

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        match Url::parse(&self.url) {
            Ok(url) if url.scheme() != "ws" => diag.error_with_hint(
                Self::URL,
                format!("unsupported scheme `{}`", url.scheme()),
                "the feed is a plain websocket, use a ws:// address",
            ),
            Ok(_) => {}
            Err(e) => diag.error(Self::URL, format!("invalid url `{}`: {e}", self.url)),
        }
        if self.max_attempts == 0 {
            diag.error(Self::MAX_ATTEMPTS, "must be at least 1");
        }
        if self.read_timeout_ms == 0 {
            diag.error(Self::READ_TIMEOUT, "must be at least 1");
        }
        if self.connect_timeout_ms == 0 {
            diag.error(Self::CONNECT_TIMEOUT, "must be at least 1");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_feed_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.feed.url, "ws://127.0.0.1:8000/ws/bnt/");
        assert_eq!(config.feed.reconnect_interval_ms, 1000);
        assert_eq!(config.feed.max_attempts, 60);
        assert_eq!(config.feed.read_timeout().as_millis(), 50);
        assert_eq!(config.feed.connect_timeout().as_millis(), 5000);
    }

    #[test]
    fn test_feed_config_partial_override() {
        let config = test_parse_config("[feed]\nmax_attempts = 5");
        assert_eq!(config.feed.max_attempts, 5);
        assert_eq!(config.feed.reconnect_interval().as_millis(), 1000);
    }

    #[test]
    fn test_feed_config_validation() {
        let config = test_parse_config(
            "[feed]\nurl = \"https://example.com/feed\"\nmax_attempts = 0\nread_timeout_ms = 0\nconnect_timeout_ms = 0",
        );
        let mut diag = ConfigDiagnostics::new();
        config.feed.validate(&mut diag);
        assert_eq!(diag.len(), 4);

        let config = test_parse_config("[feed]\nurl = \"not a url\"");
        let mut diag = ConfigDiagnostics::new();
        config.feed.validate(&mut diag);
        assert_eq!(diag.len(), 1);
    }
}

//! Reconnect policy.
//!
//! Pure state machine: it decides whether and when to retry, the connection
//! actor does the sleeping. Fixed interval, capped attempts, counter reset
//! on every successful open.

use std::time::Duration;

use crate::config::FeedConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Try again after `delay`; `attempt` is 1-based
    Retry { attempt: u32, delay: Duration },
    /// Cap reached, stop for good
    GiveUp { attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    interval: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            attempts: 0,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.reconnect_interval(), config.max_attempts)
    }

    /// Reconnect attempts since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn on_open(&mut self) {
        self.attempts = 0;
    }

    /// The connection closed or failed to open.
    pub fn on_close(&mut self) -> ReconnectDecision {
        if self.attempts < self.max_attempts {
            self.attempts += 1;
            ReconnectDecision::Retry {
                attempt: self.attempts,
                delay: self.interval,
            }
        } else {
            ReconnectDecision::GiveUp {
                attempts: self.attempts,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_millis(1000);

    #[test]
    fn test_defaults_from_config() {
        let policy = ReconnectPolicy::from_config(&FeedConfig::default());
        assert_eq!(policy.max_attempts(), 60);
        assert_eq!(policy.attempts(), 0);
    }

    #[test]
    fn test_fixed_interval() {
        let mut policy = ReconnectPolicy::new(SECOND, 3);
        for attempt in 1..=3 {
            assert_eq!(
                policy.on_close(),
                ReconnectDecision::Retry {
                    attempt,
                    delay: SECOND
                }
            );
        }
        assert_eq!(policy.on_close(), ReconnectDecision::GiveUp { attempts: 3 });
    }

    #[test]
    fn test_sixtieth_attempt_is_last() {
        let mut policy = ReconnectPolicy::new(SECOND, 60);
        for _ in 0..59 {
            assert!(matches!(policy.on_close(), ReconnectDecision::Retry { .. }));
        }
        assert_eq!(policy.attempts(), 59);

        assert_eq!(
            policy.on_close(),
            ReconnectDecision::Retry {
                attempt: 60,
                delay: SECOND
            }
        );
        assert_eq!(policy.on_close(), ReconnectDecision::GiveUp { attempts: 60 });
        assert_eq!(policy.on_close(), ReconnectDecision::GiveUp { attempts: 60 });
    }

    #[test]
    fn test_open_resets_counter() {
        let mut policy = ReconnectPolicy::new(SECOND, 2);
        policy.on_close();
        policy.on_close();
        policy.on_open();
        assert_eq!(policy.attempts(), 0);
        assert!(matches!(
            policy.on_close(),
            ReconnectDecision::Retry { attempt: 1, .. }
        ));
    }
}

//! Bounded exponential backoff for transient store failures.

use std::time::Duration;

use tracing::warn;

use super::SinkError;
use crate::config::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never below one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_backoff: Duration::from_millis(cfg.initial_backoff_ms),
            max_backoff: Duration::from_millis(cfg.max_backoff_ms.max(cfg.initial_backoff_ms)),
        }
    }
}

impl RetryPolicy {
    /// Policy that never waits, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Returns the value with the number of attempts used, or the last error
    /// with the same count.
    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<(T, u32), (SinkError, u32)>
    where
        F: FnMut() -> Result<T, SinkError>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok((value, attempt)),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        batch = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Transient store failure, retrying: {}",
                        e
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(40), Duration::from_millis(350));
    }

    #[test]
    fn test_transient_errors_are_retried() {
        let policy = RetryPolicy::immediate(3);
        let mut calls = 0;
        let (value, attempts) = policy
            .run("test", || {
                calls += 1;
                if calls < 3 {
                    Err(SinkError::Transient("locked".into()))
                } else {
                    Ok(calls)
                }
            })
            .unwrap();
        assert_eq!((value, attempts), (3, 3));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::immediate(2);
        let (err, attempts) = policy
            .run("test", || Err::<(), _>(SinkError::Transient("locked".into())))
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        let policy = RetryPolicy::immediate(5);
        let mut calls = 0;
        let (_, attempts) = policy
            .run("test", || {
                calls += 1;
                Err::<(), _>(SinkError::Sqlite(rusqlite::Error::InvalidQuery))
            })
            .unwrap_err();
        assert_eq!((calls, attempts), (1, 1));
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let cfg = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert_eq!(RetryPolicy::from(&cfg).max_attempts, 1);
    }
}

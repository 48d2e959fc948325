//! Exponential backoff for table writes.

use crate::error::EtlError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            backoff_multiplier: 2.0,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0 = first retry).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis(base.min(self.max_backoff_ms as f64) as u64)
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number and must leave no partial
    /// output behind when it is called again.
    ///
    /// # Errors
    /// [`EtlError::WriteExhausted`] carrying the last failure.
    pub fn run<T, F>(&self, table: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(val) => return Ok(val),
                Err(e) if attempt >= attempts => {
                    return Err(EtlError::WriteExhausted {
                        table: table.to_string(),
                        attempts,
                        message: format!("{e:#}"),
                    }
                    .into());
                }
                Err(e) => {
                    let wait = self.backoff(attempt - 1);
                    tracing::warn!(
                        table,
                        attempt,
                        max = attempts,
                        backoff_ms = wait.as_millis() as u64,
                        error = %e,
                        "Retrying table write"
                    );
                    std::thread::sleep(wait);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn instant() -> RetryPolicy {
        RetryPolicy {
            initial_backoff_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_ms: 300,
            max_attempts: 5,
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(300));
        assert_eq!(policy.backoff(7), Duration::from_millis(300));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let out = instant()
            .run("dim_hotel", |attempt| {
                calls += 1;
                if attempt < 3 { Err(anyhow!("disk hiccup")) } else { Ok(attempt) }
            })
            .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_with_write_exhausted() {
        let err = instant()
            .run::<(), _>("fact_reviews", |_| Err(anyhow!("read-only file system")))
            .unwrap_err();
        match err.downcast_ref::<EtlError>() {
            Some(EtlError::WriteExhausted { table, attempts, message }) => {
                assert_eq!(table, "fact_reviews");
                assert_eq!(*attempts, 3);
                assert!(message.contains("read-only"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

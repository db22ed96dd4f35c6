//! Optimistic-concurrency retry for load-mutate-save cycles.

use std::future::Future;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `op` until it succeeds, fails with anything other than
    /// `VersionConflict`, or the attempts are used up.
    ///
    /// `op` must reload its documents on every call.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(AppError::VersionConflict(id)) if attempt < self.max_attempts => {
                    tracing::debug!(document = %id, attempt, "version conflict, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_version_conflicts_until_success() {
        let calls = &AtomicU32::new(0);
        let result = RetryPolicy::new(3)
            .run(move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::VersionConflict("u1".into()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = RetryPolicy::new(2)
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::VersionConflict("u1".into()))
            })
            .await;

        assert!(matches!(result, Err(AppError::VersionConflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = RetryPolicy::default()
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::not_found("User", "x"))
            })
            .await;

        assert!(matches!(result, Err(AppError::NotFound(..))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

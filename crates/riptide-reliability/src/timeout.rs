//! Fixed-deadline request timeout.
//!
//! The proxy's timeout contract is a single configurable ceiling
//! (`HTTP_TOTAL_TIMEOUT`, default 90s) applied per outbound request — no
//! per-domain learning, no backoff curve. [`with_deadline`] is the one
//! primitive every caller that wants that ceiling enforced reaches for.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// The deadline elapsed before `fut` resolved.
#[derive(Debug, Error)]
#[error("operation exceeded {0:?} timeout")]
pub struct DeadlineExceeded(pub Duration);

/// Run `fut` to completion or return [`DeadlineExceeded`] after `timeout`.
pub async fn with_deadline<F, T>(timeout: Duration, fut: F) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| DeadlineExceeded(timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_before_deadline() {
        let result = with_deadline(Duration::from_millis(50), async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn exceeds_deadline() {
        let result = with_deadline(Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            42
        })
        .await;
        assert!(result.is_err());
    }
}

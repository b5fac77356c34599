use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a deadline-bounded operation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome<T> {
    /// The operation finished within its deadline
    Completed(T),
    /// The deadline elapsed first
    TimedOut(Duration),
    /// The cancellation token fired first
    Cancelled,
}

/// Run a future with a timeout, mapping expiry to [`Error::Timeout`]
pub async fn with_timeout<F, T>(future: F, duration: Duration) -> Result<T>
where
    F: Future<Output = T>,
{
    timeout(duration, future)
        .await
        .map_err(|_| Error::Timeout { timeout: duration })
}

/// Run a named operation bounded by both a deadline and a cancellation token
pub async fn with_deadline<F, T>(
    operation_name: &str,
    future: F,
    deadline: Duration,
    token: &CancellationToken,
) -> BranchOutcome<T>
where
    F: Future<Output = T>,
{
    let start_time = Instant::now();
    debug!(
        "Starting operation '{}' with deadline {:?}",
        operation_name, deadline
    );

    tokio::select! {
        biased;
        () = token.cancelled() => {
            debug!("Operation '{}' cancelled after {:?}", operation_name, start_time.elapsed());
            BranchOutcome::Cancelled
        }
        result = timeout(deadline, future) => match result {
            Ok(value) => {
                debug!(
                    "Operation '{}' completed in {:?}",
                    operation_name,
                    start_time.elapsed()
                );
                BranchOutcome::Completed(value)
            }
            Err(_) => {
                warn!("Operation '{}' timed out after {:?}", operation_name, deadline);
                BranchOutcome::TimedOut(deadline)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(async { 42 }, Duration::from_millis(100)).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expiry() {
        let result = with_timeout(
            async {
                sleep(Duration::from_millis(200)).await;
                42
            },
            Duration::from_millis(50),
        )
        .await;

        assert!(matches!(result, Err(Error::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_deadline_completed() {
        let token = CancellationToken::new();
        let outcome = with_deadline("fast", async { "done" }, Duration::from_secs(1), &token).await;
        assert_eq!(outcome, BranchOutcome::Completed("done"));
    }

    #[tokio::test]
    async fn test_deadline_timed_out() {
        let token = CancellationToken::new();
        let outcome = with_deadline(
            "slow",
            async {
                sleep(Duration::from_secs(10)).await;
                1
            },
            Duration::from_millis(20),
            &token,
        )
        .await;

        assert_eq!(outcome, BranchOutcome::TimedOut(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_deadline_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        let outcome = with_deadline(
            "cancelled",
            async {
                sleep(Duration::from_secs(10)).await;
                1
            },
            Duration::from_secs(5),
            &token,
        )
        .await;

        assert_eq!(outcome, BranchOutcome::Cancelled);
    }
}

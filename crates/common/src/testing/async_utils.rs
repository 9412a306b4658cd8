//! Async testing utilities

// Test helpers are self-explanatory; skip the errors/panics doc sections.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::future::Future;
use std::time::Duration;

/// Wait for a future to complete with a timeout, returning a Result
pub async fn timeout_ok<F, T>(duration: Duration, fut: F) -> Result<T, tokio::time::error::Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut).await
}

/// Poll an async condition until it returns true or times out
///
/// ```no_run
/// use std::time::Duration;
///
/// use kiddo_common::testing::poll_until;
///
/// # async fn demo(queue: kiddo_common::AckQueue<String>) {
/// let drained = poll_until(Duration::from_secs(1), Duration::from_millis(10), || async {
///     queue.is_empty() && queue.in_flight_len() == 0
/// })
/// .await;
/// assert!(drained);
/// # }
/// ```
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }

    condition().await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_timeout_ok_succeeds() {
        let result = timeout_ok(Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            42
        })
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_poll_until_observes_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = flag.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            flag_clone.store(true, Ordering::SeqCst);
        });

        let result = poll_until(Duration::from_secs(1), Duration::from_millis(5), || async {
            flag.load(Ordering::SeqCst)
        })
        .await;

        assert!(result);
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let result =
            poll_until(Duration::from_millis(30), Duration::from_millis(5), || async { false })
                .await;

        assert!(!result);
    }
}

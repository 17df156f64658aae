//! Polling with a deadline

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Timing used for UI waits
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Delay between two evaluations of a condition
    pub poll_interval: Duration,

    /// Timeout for waits that have no fixture-provided timeout
    pub default_timeout: Duration,

    /// Timeout for the intercepted form submission
    pub intercept_timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            default_timeout: Duration::from_secs(4),
            intercept_timeout: Duration::from_secs(30),
        }
    }
}

/// Evaluate `condition` every `interval` until it returns `true`.
///
/// The condition is always evaluated at least once. Once `timeout` has
/// elapsed without success the wait fails with [`E2eError::ElementTimeout`].
/// Errors returned by the condition abort the wait immediately.
pub async fn poll_until<F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut condition: F,
) -> E2eResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if condition().await? {
            debug!("'{}' satisfied after {} attempt(s)", what, attempts);
            return Ok(());
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(E2eError::ElementTimeout {
                what: what.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        sleep(interval.min(timeout - elapsed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_returns_once_condition_holds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        poll_until("third call", Duration::from_secs(2), Duration::from_millis(5), move || async move {
            Ok(calls.fetch_add(1, Ordering::SeqCst) >= 2)
        })
        .await
        .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out() {
        let start = Instant::now();
        let err = poll_until("never", Duration::from_millis(50), Duration::from_millis(10), || async {
            Ok(false)
        })
        .await
        .unwrap_err();

        assert!(start.elapsed() >= Duration::from_millis(50));
        match err {
            E2eError::ElementTimeout { what, timeout_ms } => {
                assert_eq!(what, "never");
                assert_eq!(timeout_ms, 50);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_zero_timeout_still_checks_once() {
        poll_until("immediate", Duration::ZERO, Duration::from_millis(10), || async { Ok(true) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_condition_error_aborts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let err = poll_until("broken", Duration::from_secs(5), Duration::from_millis(5), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<bool, _>(E2eError::Bridge("gone".to_string()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "bridge");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

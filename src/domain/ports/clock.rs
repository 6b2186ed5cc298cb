//! Injectable clock and sleep, so retry timing and breaker recovery are
//! deterministic under test.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time source and sleep used by breakers, the retry envelope, and the
/// convergence loop. No component reads ambient time directly.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by `Utc::now` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

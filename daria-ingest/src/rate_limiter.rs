//! Minimum spacing between outbound requests (`request_interval_ms`)

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// Sleep until `min_interval` has passed since the previous call
    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;

        if let Some(ready_at) = last.map(|previous| previous + self.min_interval) {
            let now = Instant::now();
            if ready_at > now {
                tracing::debug!("Rate limiting: waiting {:?}", ready_at - now);
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
    }
}

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between outbound Slack API calls.
///
/// Callers queue on the lock, so concurrent updates from many resolvers are
/// released one interval apart.
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter that allows `rps` requests per second. Values that
    /// are not finite and positive mean one request per second.
    pub fn new(rps: f32) -> Self {
        let rps = if rps.is_finite() && rps > 0.0 { rps } else { 1.0 };
        Self {
            min_interval: Duration::from_secs_f32(1.0 / rps),
            last: Mutex::new(None),
        }
    }

    /// Wait until the next slot is available, then claim it.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

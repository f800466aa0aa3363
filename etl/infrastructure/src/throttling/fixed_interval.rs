use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use etl_application::throttle::RequestThrottle;
use shaku::Component;
use tokio::sync::Mutex;

/// Enforces a minimum interval between consecutive calls to the provider.
#[derive(Component)]
#[shaku(interface = RequestThrottle)]
pub struct FixedIntervalThrottle {
    interval: Duration,
    last_call: Arc<Mutex<Option<Instant>>>,
}

impl FixedIntervalThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl RequestThrottle for FixedIntervalThrottle {
    async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spaces_consecutive_calls() {
        let throttle = FixedIntervalThrottle::new(Duration::from_millis(30));

        let started = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;

        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_zero_interval_never_sleeps() {
        let throttle = FixedIntervalThrottle::new(Duration::ZERO);

        let started = Instant::now();
        for _ in 0..100 {
            throttle.acquire().await;
        }

        assert!(started.elapsed() < Duration::from_millis(20));
    }
}

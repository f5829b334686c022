//! Inbound admission control: a token bucket with a timed refill task.
//!
//! Purely gates the inbound request rate; outbound identity is the egress
//! rotator's job. The refill task is owned by the bucket and stops when the
//! bucket is dropped.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct TokenBucket {
    tokens: Arc<Mutex<u32>>,
    refill: JoinHandle<()>,
}

impl TokenBucket {
    /// Build a bucket holding `capacity` tokens, refilled one token every
    /// `1/rate` seconds. Must be called from within a tokio runtime.
    pub fn new(rate: u32, capacity: u32) -> Self {
        let tokens = Arc::new(Mutex::new(capacity));
        let period = Duration::from_secs_f64(1.0 / f64::from(rate.max(1)));

        let shared = tokens.clone();
        let refill = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval's first tick fires immediately; the bucket starts
            // full, so skip it.
            interval.tick().await;

            loop {
                interval.tick().await;
                let mut tokens = shared.lock().unwrap();
                if *tokens < capacity {
                    *tokens += 1;
                }
            }
        });

        Self { tokens, refill }
    }

    /// Take one token if available.
    pub fn allow(&self) -> bool {
        let mut tokens = self.tokens.lock().unwrap();
        if *tokens > 0 {
            *tokens -= 1;
            true
        } else {
            false
        }
    }
}

impl Drop for TokenBucket {
    fn drop(&mut self) {
        self.refill.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_drains_then_denies() {
        let bucket = TokenBucket::new(5, 10);

        for i in 0..10 {
            assert!(bucket.allow(), "call {i} should pass");
        }
        assert!(!bucket.allow(), "11th call must be denied");
    }

    #[tokio::test(start_paused = true)]
    async fn refill_grants_exactly_one_token_per_period() {
        let bucket = TokenBucket::new(5, 10);

        while bucket.allow() {}
        assert!(!bucket.allow());

        // One refill period at rate 5 is 200ms.
        tokio::time::sleep(Duration::from_millis(210)).await;
        tokio::task::yield_now().await;

        assert!(bucket.allow(), "one token should have been refilled");
        assert!(!bucket.allow(), "only one token per period");
    }

    #[tokio::test(start_paused = true)]
    async fn refill_caps_at_capacity() {
        let bucket = TokenBucket::new(5, 2);

        // Bucket starts full; let many periods elapse.
        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;

        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(!bucket.allow());
    }
}

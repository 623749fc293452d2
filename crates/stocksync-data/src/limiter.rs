//! Shared outbound request rate limiter.
//!
//! One token bucket for ALL provider calls in a run: at most `max_requests`
//! acquisitions per rolling `window`. The limiter is an explicitly
//! constructed instance passed to every provider client (no module-level
//! state), consumed serially by the single-threaded pipeline.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Rolling-window token bucket.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    /// Timestamps of the most recent acquisitions, oldest first.
    stamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Provider ceiling: 2 requests per 5 seconds.
    pub fn provider_default() -> Self {
        Self::new(2, Duration::from_secs(5))
    }

    /// Create a limiter allowing `max_requests` per `window`.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        assert!(max_requests > 0, "rate limiter needs at least one slot");
        Self {
            max_requests,
            window,
            stamps: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Wait until a request slot is free, then consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.stamps.lock().await;
                let now = Instant::now();

                // Expire acquisitions that left the rolling window.
                while let Some(&oldest) = stamps.front() {
                    if now.duration_since(oldest) >= self.window {
                        stamps.pop_front();
                    } else {
                        break;
                    }
                }

                if stamps.len() < self.max_requests {
                    stamps.push_back(now);
                    return;
                }

                // Full: sleep until the oldest stamp expires, then re-check.
                let oldest = *stamps.front().expect("bucket is full");
                self.window - now.duration_since(oldest)
            };

            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_limit_is_immediate() {
        let limiter = RateLimiter::new(2, Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_request_waits_for_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(5));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_is_shared_across_clones() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(5)));
        let start = Instant::now();
        limiter.acquire().await;
        let other = Arc::clone(&limiter);
        other.acquire().await;
        other.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_free_up_as_window_rolls() {
        let limiter = RateLimiter::new(2, Duration::from_secs(5));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(6)).await;
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}

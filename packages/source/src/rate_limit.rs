//! Global token-bucket rate limiter for police API requests.
//!
//! The API allows 15 requests per second with bursts of up to 30. Every
//! worker acquires a token before sending, so the limit holds across the
//! whole pool rather than per worker. A `429` response drains the bucket,
//! slowing every worker down at once.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Requests per second published in the API's call limits.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 15.0;

/// Burst size published in the API's call limits.
pub const DEFAULT_BURST: u32 = 30;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared by every request in a run.
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    bucket: Mutex<Bucket>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_SECOND, DEFAULT_BURST)
    }
}

impl RateLimiter {
    /// Creates a full bucket holding `burst` tokens, refilled at
    /// `requests_per_second`.
    #[must_use]
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            rate: requests_per_second.max(f64::MIN_POSITIVE),
            capacity,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Waits until a token is available and takes it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                self.refill(&mut bucket);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate)
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Empties the bucket after the API reports rate limiting.
    pub async fn drain(&self) {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket);
        bucket.tokens = 0.0;
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = elapsed.mul_add(self.rate, bucket.tokens).min(self.capacity);
        bucket.last_refill = now;
    }
}

//! Token-bucket rate limiter for the embedding provider.
//!
//! The bucket holds `capacity` tokens and regains one token every `60s / capacity`.
//! Refill is lazy: it is computed from the elapsed time whenever the limiter is touched,
//! so there is no background task and tests can drive it with a paused tokio clock.

mod error;


pub use error::{RateLimitError, RateLimitResult};

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::constants::RATE_LIMIT_WINDOW;

#[derive(Debug)]
struct BucketState {
    available: u32,
    last_refill: Instant,
}

/// Caps calls to a costed resource at `capacity` per minute.
pub struct TokenBucketLimiter {
    capacity: u32,
    refill_interval: Duration,
    state: Mutex<BucketState>,
    disposed: AtomicBool,
}

impl TokenBucketLimiter {
    /// Creates a full bucket allowing `max_requests_per_minute` grants per minute.
    pub fn new(max_requests_per_minute: u32) -> RateLimitResult<Self> {
        if max_requests_per_minute == 0 {
            return Err(RateLimitError::InvalidCapacity {
                capacity: max_requests_per_minute,
            });
        }

        Ok(Self {
            capacity: max_requests_per_minute,
            refill_interval: RATE_LIMIT_WINDOW / max_requests_per_minute,
            state: Mutex::new(BucketState {
                available: max_requests_per_minute,
                last_refill: Instant::now(),
            }),
            disposed: AtomicBool::new(false),
        })
    }

    /// Max tokens the bucket can hold.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Time needed to regain a single token.
    #[inline]
    pub fn refill_interval(&self) -> Duration {
        self.refill_interval
    }

    /// Takes a token if one is available. Never blocks; no token is consumed on failure.
    pub fn try_acquire(&self) -> RateLimitResult<bool> {
        self.ensure_live()?;

        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());

        if state.available > 0 {
            state.available -= 1;
            trace!(remaining = state.available, "Rate limit token granted");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Waits for a token for at most `timeout`.
    ///
    /// Sleeps until the next refill instant rather than polling. Returns
    /// [`RateLimitError::Exceeded`] once the deadline passes and
    /// [`RateLimitError::Cancelled`] if `cancel` fires while waiting.
    pub async fn acquire(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> RateLimitResult<()> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.try_acquire()? {
                return Ok(());
            }

            let now = Instant::now();
            let next_refill = self.next_refill_time()?;

            if now >= deadline {
                let retry_after = next_refill.saturating_duration_since(now);
                debug!(?retry_after, "Timed out waiting for rate limit token");
                return Err(RateLimitError::Exceeded { retry_after });
            }

            let wake_at = next_refill.min(deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RateLimitError::Cancelled),
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    /// Tokens currently available (after applying any pending refill).
    pub fn available_tokens(&self) -> RateLimitResult<u32> {
        self.ensure_live()?;

        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());
        Ok(state.available)
    }

    /// Instant at which the next token will be added. `now` when the bucket is full.
    pub fn next_refill_time(&self) -> RateLimitResult<Instant> {
        self.ensure_live()?;

        let now = Instant::now();
        let mut state = self.state.lock();
        self.refill(&mut state, now);

        if state.available >= self.capacity {
            Ok(now)
        } else {
            Ok(state.last_refill + self.refill_interval)
        }
    }

    /// How long a caller would have to wait for a token right now.
    pub fn time_until_next_token(&self) -> RateLimitResult<Duration> {
        if self.available_tokens()? > 0 {
            return Ok(Duration::ZERO);
        }
        Ok(self
            .next_refill_time()?
            .saturating_duration_since(Instant::now()))
    }

    /// Restores full capacity immediately.
    pub fn reset(&self) -> RateLimitResult<()> {
        self.ensure_live()?;

        let mut state = self.state.lock();
        state.available = self.capacity;
        state.last_refill = Instant::now();
        debug!(capacity = self.capacity, "Rate limiter reset");
        Ok(())
    }

    /// Invalidates the limiter. Every later call returns [`RateLimitError::Disposed`].
    pub fn dispose(&self) {
        // Release pairs with the Acquire load in ensure_live.
        self.disposed.store(true, Ordering::Release);
    }

    /// Returns `true` once [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> RateLimitResult<()> {
        if self.is_disposed() {
            return Err(RateLimitError::Disposed);
        }
        Ok(())
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        if state.available >= self.capacity {
            state.last_refill = now;
            return;
        }

        let elapsed = now.saturating_duration_since(state.last_refill);
        let ticks = elapsed.as_nanos() / self.refill_interval.as_nanos();
        if ticks == 0 {
            return;
        }

        let missing = self.capacity - state.available;
        let added = ticks.min(u128::from(missing)) as u32;
        state.available += added;

        if state.available >= self.capacity {
            state.last_refill = now;
        } else {
            // Only whole ticks are consumed so partial progress toward the next token is kept.
            state.last_refill += self.refill_interval * added;
        }
    }
}

impl std::fmt::Debug for TokenBucketLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TokenBucketLimiter")
            .field("capacity", &self.capacity)
            .field("available", &state.available)
            .field("refill_interval", &self.refill_interval)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

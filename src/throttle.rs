//! Pacing policies applied after every buffer flush of file content.
//!
//! A [`Throttle`] never sleeps by itself. It returns the pause to take and
//! the upload driver waits for it, blocking the thread in
//! [`Upload::process`](crate::Upload::process) or yielding to the runtime
//! in the async drivers.

use std::time::{Duration, Instant};

use crate::UploadConfig;

/// Decides how long an upload pauses after a buffer flush.
pub trait Throttle {
    /// Called after each flush with the running flush count (starting at 1)
    /// and the size of the flushed chunk.
    fn on_flush(&mut self, flush_count: u64, bytes: usize) -> Option<Duration>;
}

/// Never pauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

impl Throttle for Unthrottled {
    fn on_flush(&mut self, _flush_count: u64, _bytes: usize) -> Option<Duration> {
        None
    }
}

/// Pauses for a fixed time after every `every`-th flush.
///
/// With a buffer of `b` bytes this caps the upload at roughly
/// `b * every / pause` bytes per second.
#[derive(Debug, Clone, Copy)]
pub struct FlushThrottle {
    every: u64,
    pause: Duration,
}

impl FlushThrottle {
    pub fn new(every: u64, pause: Duration) -> FlushThrottle {
        FlushThrottle { every, pause }
    }

    /// Builds the policy from `cpu_limit` and `buf_sleep`.
    pub fn from_config(config: &UploadConfig) -> FlushThrottle {
        FlushThrottle::new(config.cpu_limit, config.buf_sleep())
    }
}

impl Default for FlushThrottle {
    fn default() -> Self {
        FlushThrottle::from_config(&UploadConfig::default())
    }
}

impl Throttle for FlushThrottle {
    fn on_flush(&mut self, flush_count: u64, _bytes: usize) -> Option<Duration> {
        if self.every == 0 || self.pause == Duration::from_secs(0) {
            return None;
        }

        if flush_count % self.every == 0 {
            Some(self.pause)
        } else {
            None
        }
    }
}

/// Token bucket limiting the byte rate of a single upload.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    rate: u64,
    burst: u64,
    tokens: f64,
    last_refill: Option<Instant>,
}

impl TokenBucket {
    /// Allows `rate` bytes per second with bursts of up to `burst` bytes.
    pub fn new(rate: u64, burst: u64) -> TokenBucket {
        TokenBucket {
            rate,
            burst,
            tokens: burst as f64,
            last_refill: None,
        }
    }

    fn refill(&mut self, now: Instant) {
        if let Some(last) = self.last_refill {
            let earned = now.saturating_duration_since(last).as_secs_f64() * self.rate as f64;
            self.tokens = (self.tokens + earned).min(self.burst as f64);
        }
        self.last_refill = Some(now);
    }
}

impl Throttle for TokenBucket {
    fn on_flush(&mut self, _flush_count: u64, bytes: usize) -> Option<Duration> {
        if self.rate == 0 {
            return None;
        }

        self.refill(Instant::now());
        self.tokens -= bytes as f64;

        if self.tokens >= 0.0 {
            return None;
        }

        // The debt is paid back by the pause, so the next refill starts from zero.
        let pause = Duration::from_secs_f64(-self.tokens / self.rate as f64);
        self.tokens = 0.0;
        self.last_refill = self.last_refill.map(|last| last + pause);
        Some(pause)
    }
}

impl<T: Throttle + ?Sized> Throttle for &mut T {
    fn on_flush(&mut self, flush_count: u64, bytes: usize) -> Option<Duration> {
        (**self).on_flush(flush_count, bytes)
    }
}

impl<T: Throttle + ?Sized> Throttle for Box<T> {
    fn on_flush(&mut self, flush_count: u64, bytes: usize) -> Option<Duration> {
        (**self).on_flush(flush_count, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unthrottled() {
        let mut throttle = Unthrottled;
        assert_eq!(throttle.on_flush(1, 1024), None);
    }

    #[test]
    fn test_flush_throttle_pauses_every_nth_flush() {
        let mut throttle = FlushThrottle::new(3, Duration::from_millis(5));

        let pauses = (1..=7)
            .map(|count| throttle.on_flush(count, 1024))
            .collect::<Vec<_>>();

        assert_eq!(
            pauses,
            vec![
                None,
                None,
                Some(Duration::from_millis(5)),
                None,
                None,
                Some(Duration::from_millis(5)),
                None
            ]
        );
    }

    #[test]
    fn test_flush_throttle_disabled() {
        let mut throttle = FlushThrottle::new(0, Duration::from_millis(5));
        assert_eq!(throttle.on_flush(10, 1024), None);

        let mut throttle = FlushThrottle::new(1, Duration::from_millis(0));
        assert_eq!(throttle.on_flush(10, 1024), None);
    }

    #[test]
    fn test_flush_throttle_from_config() {
        let config = UploadConfig::new().cpu_limit(2).buf_sleep_ms(7);
        let mut throttle = FlushThrottle::from_config(&config);

        assert_eq!(throttle.on_flush(1, 1), None);
        assert_eq!(throttle.on_flush(2, 1), Some(Duration::from_millis(7)));
    }

    #[test]
    fn test_token_bucket() {
        let mut bucket = TokenBucket::new(1000, 1000);

        assert_eq!(bucket.on_flush(1, 600), None);

        let pause = bucket.on_flush(2, 2400).unwrap();
        assert!(pause > Duration::from_millis(1900), "{:?}", pause);
        assert!(pause <= Duration::from_millis(2000), "{:?}", pause);
    }
}

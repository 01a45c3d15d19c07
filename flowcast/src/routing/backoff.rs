//! Retry policy for rate-limited directions calls.
//!
//! The provider may attach a retry-after hint to a rate-limit response. The
//! delay before the next attempt is the hint plus one second of padding,
//! capped at five seconds. Without a hint the full five seconds is used.
//!
//! ```text
//! hint 2s   -> wait 3s
//! hint 4s   -> wait 5s
//! hint 10s  -> wait 5s (cap)
//! no hint   -> wait 5s (fallback)
//! retry > 3 -> give up
//! ```

use std::time::Duration;

/// Default maximum number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default padding added to the provider's hint.
pub const DEFAULT_HINT_PADDING: Duration = Duration::from_secs(1);

/// Default cap on any single retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);

/// Default delay when the provider gives no hint.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_secs(5);

/// Rate-limit retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitBackoff {
    /// Maximum retries after the initial attempt.
    pub max_retries: u32,
    /// Added to the provider's retry-after hint.
    pub hint_padding: Duration,
    /// Upper bound for a hinted delay.
    pub max_delay: Duration,
    /// Used when no hint is present.
    pub fallback_delay: Duration,
}

impl Default for RateLimitBackoff {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            hint_padding: DEFAULT_HINT_PADDING,
            max_delay: DEFAULT_MAX_DELAY,
            fallback_delay: DEFAULT_FALLBACK_DELAY,
        }
    }
}

impl RateLimitBackoff {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay for a given retry-after hint.
    pub fn delay_for_hint(&self, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => (hint + self.hint_padding).min(self.max_delay),
            None => self.fallback_delay,
        }
    }

    /// Delay before retry number `retry` (1-based), or `None` once the retry
    /// budget is exhausted.
    pub fn delay_for_retry(&self, retry: u32, hint: Option<Duration>) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries {
            None
        } else {
            Some(self.delay_for_hint(hint))
        }
    }
}

use std::collections::BTreeSet;

use crate::config::{ConfigSource, EnvSource};

pub const DEFAULT_BASE_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 30_000;
pub const DEFAULT_JITTER_MIN: f64 = 0.5;
pub const DEFAULT_JITTER_MAX: f64 = 1.5;
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Controls how many attempts are made and how long to wait between them.
///
/// Fields are public for ergonomic construction; the client always stores
/// the [`normalized`](RetryPolicy::normalized) form, so the bounds below hold
/// for every policy a retry loop reads:
///
/// - `base_backoff_ms >= 1`
/// - `max_attempts >= 1`
/// - `retryable_statuses` is non-empty
/// - `backoff_cap_ms >= base_backoff_ms`
/// - `0 < jitter_min <= jitter_max`
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second attempt; doubled for each further attempt.
    pub base_backoff_ms: u64,
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Response status codes that trigger another attempt.
    pub retryable_statuses: BTreeSet<u16>,
    /// Upper bound on the un-jittered delay, server hints included.
    pub backoff_cap_ms: u64,
    /// Lower bound (inclusive) of the jitter multiplier.
    pub jitter_min: f64,
    /// Upper bound (exclusive) of the jitter multiplier.
    pub jitter_max: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retryable_statuses: default_retryable_statuses(),
            backoff_cap_ms: DEFAULT_BACKOFF_CAP_MS,
            jitter_min: DEFAULT_JITTER_MIN,
            jitter_max: DEFAULT_JITTER_MAX,
        }
    }
}

pub(crate) fn default_retryable_statuses() -> BTreeSet<u16> {
    DEFAULT_RETRYABLE_STATUSES.into_iter().collect()
}

impl RetryPolicy {
    /// Loads a policy from process environment variables.
    ///
    /// Reads `BASE_BACKOFF_MS`, `MAX_ATTEMPTS`, `RETRY_STATUS_SET`,
    /// `BACKOFF_CAP_MS`, `JITTER_MIN` and `JITTER_MAX`. Missing or malformed
    /// values fall back to the crate defaults.
    pub fn from_env() -> Self {
        Self::from_source(&EnvSource::default())
    }

    /// Loads a policy from any named-lookup source, then normalizes it.
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Self {
        let base = source.get_i64("BASE_BACKOFF_MS", DEFAULT_BASE_BACKOFF_MS as i64);
        let attempts = source.get_i64("MAX_ATTEMPTS", i64::from(DEFAULT_MAX_ATTEMPTS));
        let cap = source.get_i64("BACKOFF_CAP_MS", DEFAULT_BACKOFF_CAP_MS as i64);

        Self {
            // Negative inputs collapse to zero and are fixed up by `normalized`.
            base_backoff_ms: u64::try_from(base).unwrap_or(0),
            max_attempts: u32::try_from(attempts.max(0)).unwrap_or(u32::MAX),
            retryable_statuses: source
                .get_status_set("RETRY_STATUS_SET", &default_retryable_statuses()),
            backoff_cap_ms: u64::try_from(cap).unwrap_or(0),
            jitter_min: source.get_f64("JITTER_MIN", DEFAULT_JITTER_MIN),
            jitter_max: source.get_f64("JITTER_MAX", DEFAULT_JITTER_MAX),
        }
        .normalized()
    }

    /// Returns a copy with every violated bound reset to a safe value.
    ///
    /// Never fails: out-of-range values are replaced, not rejected.
    pub fn normalized(mut self) -> Self {
        if self.retryable_statuses.is_empty() {
            self.retryable_statuses = default_retryable_statuses();
        }
        let jitter_valid = self.jitter_min.is_finite()
            && self.jitter_max.is_finite()
            && self.jitter_min > 0.0
            && self.jitter_max >= self.jitter_min;
        if !jitter_valid {
            self.jitter_min = DEFAULT_JITTER_MIN;
            self.jitter_max = DEFAULT_JITTER_MAX;
        }
        if self.base_backoff_ms < 1 {
            self.base_backoff_ms = DEFAULT_BASE_BACKOFF_MS;
        }
        if self.backoff_cap_ms < self.base_backoff_ms {
            self.backoff_cap_ms = self.base_backoff_ms;
        }
        if self.max_attempts < 1 {
            self.max_attempts = 1;
        }
        self
    }

    /// Whether a response with `status` should be retried.
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    pub fn with_base_backoff_ms(mut self, base_backoff_ms: u64) -> Self {
        self.base_backoff_ms = base_backoff_ms;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retryable_statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        self.retryable_statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_backoff_cap_ms(mut self, backoff_cap_ms: u64) -> Self {
        self.backoff_cap_ms = backoff_cap_ms;
        self
    }

    pub fn with_jitter(mut self, jitter_min: f64, jitter_max: f64) -> Self {
        self.jitter_min = jitter_min;
        self.jitter_max = jitter_max;
        self
    }
}

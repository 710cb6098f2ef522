use crate::config::ConfigSource;

/// Configures per-request transport behavior.
///
/// Retry behavior lives in [`RetryPolicy`](crate::RetryPolicy); these options
/// only shape a single exchange.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds. Applies to each attempt, not to
    /// the whole retry sequence.
    pub timeout_ms: u64,
}

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

impl ClientOptions {
    /// Reads `REQUEST_TIMEOUT_MS` from `source`, keeping the default when it
    /// is absent, malformed or not positive.
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Self {
        let timeout_ms = source.get_i64("REQUEST_TIMEOUT_MS", DEFAULT_TIMEOUT_MS as i64);
        Self {
            timeout_ms: u64::try_from(timeout_ms)
                .ok()
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

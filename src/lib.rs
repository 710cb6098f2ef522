//! `resilient-http` dispatches HTTP requests with retry for APIs that
//! rate-limit (429) or transiently fail (5xx, connection errors).
//!
//! The entry point is [`RetryClient`], offering blocking and async variants:
//! - [`RetryClient::send_with_retry`]
//! - [`RetryClient::send_async_with_retry`]
//!
//! Delays grow exponentially with jitter, honor the server's `Retry-After`
//! hint up to a cap, and are configured by a [`RetryPolicy`] that can be
//! replaced while requests are in flight.

pub mod config;

mod cancel;
mod client;
mod delay;
mod error;
mod hint;
mod options;
mod policy;
mod transport;
mod wire;

pub use cancel::CancelToken;
pub use client::RetryClient;
pub use config::{ConfigSource, EnvSource};
pub use delay::compute_delay;
pub use error::RetryError;
pub use hint::{parse_retry_after, parse_retry_hint};
pub use options::{ClientOptions, DEFAULT_TIMEOUT_MS};
pub use policy::{
    RetryPolicy, DEFAULT_BACKOFF_CAP_MS, DEFAULT_BASE_BACKOFF_MS, DEFAULT_JITTER_MAX,
    DEFAULT_JITTER_MIN, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRYABLE_STATUSES,
};
pub use transport::{ReqwestTransport, Transport};
pub use wire::{HttpRequest, HttpResponse};

pub type Result<T> = std::result::Result<T, RetryError>;

use std::{
    collections::BTreeSet,
    fmt,
    sync::Arc,
    time::{Duration, SystemTime},
};

use arc_swap::ArcSwap;

use crate::{
    compute_delay,
    config::{ConfigSource, EnvSource},
    parse_retry_hint, CancelToken, ClientOptions, HttpRequest, HttpResponse, ReqwestTransport,
    Result, RetryPolicy, Transport,
};

/// What to do after one attempt.
enum Step {
    Done(Result<HttpResponse>),
    Retry { delay_ms: u64 },
}

/// Dispatches requests through a [`Transport`], retrying rate-limited and
/// transiently failed attempts.
///
/// Clones share the transport and the retry policy, so a policy change made
/// through one clone is seen by all of them.
pub struct RetryClient<T = ReqwestTransport> {
    transport: Arc<T>,
    policy: Arc<ArcSwap<RetryPolicy>>,
}

impl<T> Clone for RetryClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            policy: Arc::clone(&self.policy),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for RetryClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryClient")
            .field("transport", &self.transport)
            .field("policy", &*self.policy.load())
            .finish()
    }
}

impl Default for RetryClient<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryClient<ReqwestTransport> {
    /// Creates a `reqwest`-backed client with default options and policy.
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::default())
    }

    /// Creates a `reqwest`-backed client configured from environment
    /// variables.
    ///
    /// Reads `REQUEST_TIMEOUT_MS` for the transport and the keys listed on
    /// [`RetryPolicy::from_env`] for the retry policy. Missing or malformed
    /// values fall back to defaults, so this never fails.
    pub fn from_env() -> Self {
        Self::from_source(&EnvSource::default())
    }

    /// Like [`RetryClient::from_env`], reading from an arbitrary source.
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Self {
        Self::with_transport(ReqwestTransport::new(ClientOptions::from_source(source)))
            .with_policy(RetryPolicy::from_source(source))
    }

    /// Replaces the transport options, keeping the current retry policy.
    pub fn with_options(self, opts: ClientOptions) -> Self {
        Self {
            transport: Arc::new(ReqwestTransport::new(opts)),
            policy: self.policy,
        }
    }
}

impl<T: Transport> RetryClient<T> {
    /// Creates a client over a custom transport with the default policy.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            policy: Arc::new(ArcSwap::from_pointee(RetryPolicy::default())),
        }
    }

    /// Applies a retry policy (normalized before it is stored).
    pub fn with_policy(self, policy: RetryPolicy) -> Self {
        self.set_retry_policy(policy);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends `request` once, blocking, without retry.
    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.transport.send(request)
    }

    /// Sends `request` once, without retry.
    pub async fn send_async(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.transport.send_async(request).await
    }

    /// Sends `request`, retrying on retryable statuses and transport failures.
    ///
    /// Blocks the calling thread for the whole sequence, waits included.
    /// Returns the first non-retryable response. When attempts run out, the
    /// last response is returned even if its status is retryable; the last
    /// failure is returned only if the final attempt produced no response.
    pub fn send_with_retry(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.send_with_retry_until(request, &CancelToken::new())
    }

    /// [`send_with_retry`](Self::send_with_retry) with an interruptible wait.
    ///
    /// Cancelling `cancel` during a wait returns
    /// [`RetryError::Interrupted`](crate::RetryError::Interrupted) without
    /// further attempts.
    pub fn send_with_retry_until(
        &self,
        request: &HttpRequest,
        cancel: &CancelToken,
    ) -> Result<HttpResponse> {
        let mut attempt = 1u32;
        loop {
            let policy = self.policy.load_full();
            let outcome = self.transport.send(request);
            match Self::next_step(attempt, &policy, outcome) {
                Step::Done(result) => return result,
                Step::Retry { delay_ms } => {
                    cancel.wait_blocking(Duration::from_millis(delay_ms))?;
                }
            }
            attempt = attempt.saturating_add(1);
        }
    }

    /// Sends `request` asynchronously with the same retry rules as
    /// [`send_with_retry`](Self::send_with_retry).
    ///
    /// Waits use the tokio timer and never block a thread. Dropping the
    /// returned future abandons any pending wait and every attempt not yet
    /// started.
    pub async fn send_async_with_retry(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.send_async_with_retry_until(request, &CancelToken::new())
            .await
    }

    /// [`send_async_with_retry`](Self::send_async_with_retry) with a
    /// cancellable wait.
    pub async fn send_async_with_retry_until(
        &self,
        request: &HttpRequest,
        cancel: &CancelToken,
    ) -> Result<HttpResponse> {
        let mut attempt = 1u32;
        loop {
            let policy = self.policy.load_full();
            let outcome = self.transport.send_async(request).await;
            match Self::next_step(attempt, &policy, outcome) {
                Step::Done(result) => return result,
                Step::Retry { delay_ms } => {
                    cancel.wait(Duration::from_millis(delay_ms)).await?;
                }
            }
            attempt = attempt.saturating_add(1);
        }
    }

    /// Decides between returning `outcome` and waiting for another attempt.
    fn next_step(attempt: u32, policy: &RetryPolicy, outcome: Result<HttpResponse>) -> Step {
        let is_last = attempt >= policy.max_attempts;
        let retry = match &outcome {
            Ok(response) => !is_last && policy.is_retryable(response.status().as_u16()),
            Err(_) => !is_last,
        };
        if !retry {
            return Step::Done(outcome);
        }

        let hint = outcome
            .as_ref()
            .ok()
            .and_then(|response| parse_retry_hint(response, SystemTime::now()));

        let delay_ms = compute_delay(attempt, hint, policy, &mut rand::thread_rng());

        #[cfg(feature = "tracing")]
        log_retry(attempt, policy, &outcome, hint, delay_ms);

        Step::Retry { delay_ms }
    }

    /// Snapshot of the current retry policy.
    pub fn retry_policy(&self) -> Arc<RetryPolicy> {
        self.policy.load_full()
    }

    /// Replaces the retry policy.
    ///
    /// The policy is normalized first. It applies to the next attempt of new
    /// and in-flight calls.
    pub fn set_retry_policy(&self, policy: RetryPolicy) {
        self.policy.store(Arc::new(policy.normalized()));
    }

    pub fn base_backoff_ms(&self) -> u64 {
        self.policy.load().base_backoff_ms
    }

    pub fn set_base_backoff_ms(&self, base_backoff_ms: u64) {
        self.update_policy(|policy| policy.with_base_backoff_ms(base_backoff_ms));
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.load().max_attempts
    }

    pub fn set_max_attempts(&self, max_attempts: u32) {
        self.update_policy(|policy| policy.with_max_attempts(max_attempts));
    }

    pub fn retryable_statuses(&self) -> BTreeSet<u16> {
        self.policy.load().retryable_statuses.clone()
    }

    pub fn set_retryable_statuses<I>(&self, statuses: I)
    where
        I: IntoIterator<Item = u16>,
    {
        let statuses: BTreeSet<u16> = statuses.into_iter().collect();
        self.update_policy(|policy| policy.with_retryable_statuses(statuses.iter().copied()));
    }

    pub fn backoff_cap_ms(&self) -> u64 {
        self.policy.load().backoff_cap_ms
    }

    pub fn set_backoff_cap_ms(&self, backoff_cap_ms: u64) {
        self.update_policy(|policy| policy.with_backoff_cap_ms(backoff_cap_ms));
    }

    /// Current jitter bounds as `(min, max)`.
    pub fn jitter(&self) -> (f64, f64) {
        let policy = self.policy.load();
        (policy.jitter_min, policy.jitter_max)
    }

    pub fn set_jitter(&self, jitter_min: f64, jitter_max: f64) {
        self.update_policy(|policy| policy.with_jitter(jitter_min, jitter_max));
    }

    fn update_policy<F>(&self, update: F)
    where
        F: Fn(RetryPolicy) -> RetryPolicy,
    {
        self.policy
            .rcu(|current| Arc::new(update(RetryPolicy::clone(current)).normalized()));
    }
}

#[cfg(feature = "tracing")]
fn log_retry(
    attempt: u32,
    policy: &RetryPolicy,
    outcome: &Result<HttpResponse>,
    hint: Option<u64>,
    delay_ms: u64,
) {
    match outcome {
        Ok(response) => tracing::debug!(
            attempt,
            max_attempts = policy.max_attempts,
            status = response.status().as_u16(),
            retry_after_ms = ?hint,
            delay_ms,
            "retryable status, retrying"
        ),
        Err(err) => tracing::warn!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms,
            error = %err,
            "attempt failed, retrying"
        ),
    }
}

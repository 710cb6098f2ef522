use std::{fmt, future::Future, sync::OnceLock, time::Duration};

use crate::{ClientOptions, HttpRequest, HttpResponse, Result, RetryError};

/// Performs a single request/response exchange.
///
/// Implementations must be safe to call concurrently from many threads and
/// tasks. A returned `Ok` means a response was received, whatever its
/// status; `Err` means no response exists.
pub trait Transport: Send + Sync {
    /// Sends `request`, blocking the calling thread until a response arrives.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;

    /// Sends `request` without blocking.
    fn send_async(
        &self,
        request: &HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// [`Transport`] backed by `reqwest`.
///
/// The blocking client is built on first blocking use, so async-only callers
/// never start its background runtime. Do not make the first blocking call
/// (or drop the transport after one) from inside an async runtime.
pub struct ReqwestTransport {
    http: reqwest::Client,
    blocking: OnceLock<reqwest::blocking::Client>,
    options: ClientOptions,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("options", &self.options)
            .field("blocking_initialized", &self.blocking.get().is_some())
            .finish()
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl ReqwestTransport {
    pub fn new(options: ClientOptions) -> Self {
        Self::with_client(reqwest::Client::new(), options)
    }

    /// Wraps an existing async client, e.g. one with custom TLS or proxies.
    pub fn with_client(http: reqwest::Client, options: ClientOptions) -> Self {
        Self {
            http,
            blocking: OnceLock::new(),
            options,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.options.timeout_ms)
    }

    fn blocking_client(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.blocking.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(RetryError::Transport)?;
        Ok(self.blocking.get_or_init(|| client))
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .blocking_client()?
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone())
            .timeout(self.timeout());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().map_err(RetryError::Transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().map_err(RetryError::Transport)?;
        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }

    async fn send_async(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone())
            .timeout(self.timeout());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(RetryError::Transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(RetryError::Transport)?;
        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }
}

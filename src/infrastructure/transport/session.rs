//! Pooled, authenticated HTTP session to the node
//!
//! One session owns one `reqwest::Client` (and with it the connection pool), a
//! semaphore bounding the number of in-flight requests, and the close signal.
//! Everything else is read-only after construction, so a session can be shared
//! freely between tasks.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use std::error::Error as StdError;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info};

use super::policy::{Credentials, Endpoint, RetryPolicy, SessionConfig, TlsPolicy};
use crate::shared::error::{RpcClientError, TransportError};
use crate::shared::observer::RpcObserver;

const USER_AGENT: &str = concat!("bitcoin-rpc-client/", env!("CARGO_PKG_VERSION"));
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const TCP_KEEPALIVE: Duration = Duration::from_secs(60);

/// Raw HTTP response handed back to the RPC layer
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Authenticated, TLS-aware connection pool with a retry discipline
pub struct TransportSession {
    endpoint: Endpoint,
    credentials: Credentials,
    retry: RetryPolicy,
    client: Mutex<Option<reqwest::Client>>,
    permits: Semaphore,
    closed: watch::Sender<bool>,
    observer: Arc<dyn RpcObserver>,
}

impl TransportSession {
    /// Build the pooled client. Fails with a configuration error when the TLS
    /// material cannot be loaded.
    pub fn new(
        config: &SessionConfig,
        observer: Arc<dyn RpcObserver>,
    ) -> Result<Self, RpcClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_size)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE);

        let builder = Self::apply_tls(builder, &config.tls, &config.endpoint, observer.as_ref())?;

        let client = builder.build().map_err(|e| {
            RpcClientError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        let (closed, _) = watch::channel(false);

        debug!(
            endpoint = %config.endpoint,
            user = %config.credentials.username(),
            pool_max_size = config.pool_max_size,
            retries = config.retry.total,
            "HTTP session configured"
        );

        Ok(Self {
            endpoint: config.endpoint.clone(),
            credentials: config.credentials.clone(),
            retry: config.retry.clone(),
            client: Mutex::new(Some(client)),
            permits: Semaphore::new(config.pool_max_size.max(1)),
            closed,
            observer,
        })
    }

    fn apply_tls(
        mut builder: reqwest::ClientBuilder,
        tls: &TlsPolicy,
        endpoint: &Endpoint,
        observer: &dyn RpcObserver,
    ) -> Result<reqwest::ClientBuilder, RpcClientError> {
        if !tls.enabled {
            return Ok(builder);
        }

        if !tls.verify {
            builder = builder.danger_accept_invalid_certs(true);
            // Reported here, once, never per request
            observer.on_insecure_tls(&endpoint.to_string());
        }

        if let Some(path) = &tls.client_cert_path {
            let pem = std::fs::read(path).map_err(|e| {
                RpcClientError::Configuration(format!(
                    "Cannot read SSL certificate {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                RpcClientError::Configuration(format!(
                    "Invalid SSL certificate {}: {}",
                    path.display(),
                    e
                ))
            })?;
            builder = builder.identity(identity);
            info!(cert_path = %path.display(), "Using SSL client certificate");
        }

        Ok(builder)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// POST `body` to the endpoint, retrying per the session's policy.
    ///
    /// `timeout` bounds each attempt, not the whole exchange. Closing the
    /// session while this is pending fails it with [`TransportError::Closed`].
    pub async fn send(
        &self,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(TransportError::Closed);
        }

        tokio::select! {
            result = self.send_with_retries(Bytes::from(body), timeout) => result,
            _ = closed.wait_for(|closed| *closed) => Err(TransportError::Closed),
        }
    }

    async fn send_with_retries(
        &self,
        body: Bytes,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let _permit = self.permits.acquire().await.map_err(|_| TransportError::Closed)?;
        let client = self.client()?;

        let method_retryable = self.retry.allows_method(&Method::POST);
        let mut retries = 0u32;

        loop {
            let attempt = retries + 1;
            debug!(endpoint = %self.endpoint, attempt, "Sending RPC request");

            let outcome = client
                .post(self.endpoint.url().clone())
                .basic_auth(self.credentials.username(), Some(self.credentials.password()))
                .timeout(timeout)
                .body(body.clone())
                .send()
                .await;

            let (reason, delay) = match outcome {
                Ok(response) => {
                    let status = response.status();
                    if !method_retryable || !self.retry.is_retryable_status(status) {
                        return self.read_response(response, timeout).await;
                    }
                    if retries >= self.retry.total {
                        return Err(TransportError::RetriesExhausted {
                            attempts: attempt,
                            status: status.as_u16(),
                        });
                    }
                    let delay = self
                        .retry_after(&response, status)
                        .unwrap_or_else(|| self.retry.backoff_for(retries + 1));
                    (format!("HTTP {}", status.as_u16()), delay)
                }
                Err(err) => {
                    let retryable = err.is_connect() || err.is_timeout() || err.is_request();
                    let error = self.classify(&err, timeout);
                    if !method_retryable || !retryable || retries >= self.retry.total {
                        return Err(error);
                    }
                    (error.to_string(), self.retry.backoff_for(retries + 1))
                }
            };

            retries += 1;
            self.observer.on_retry(retries, &reason, delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn read_response(
        &self,
        response: reqwest::Response,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| self.classify(&e, timeout))?;
        Ok(HttpResponse { status, headers, body })
    }

    fn retry_after(&self, response: &reqwest::Response, status: StatusCode) -> Option<Duration> {
        if !self.retry.honours_retry_after(status) {
            return None;
        }
        let secs = response
            .headers()
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()?;
        Some(Duration::from_secs(secs).min(self.retry.backoff_max))
    }

    fn classify(&self, err: &reqwest::Error, timeout: Duration) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout { timeout }
        } else if err.is_connect() {
            TransportError::Connect {
                url: self.endpoint.to_string(),
                reason: error_chain(err),
            }
        } else {
            TransportError::Request(error_chain(err))
        }
    }

    fn client(&self) -> Result<reqwest::Client, TransportError> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::Closed)
    }

    /// Release the pool and fail anything in flight. Returns `false` when the
    /// session was already closed.
    pub fn close(&self) -> bool {
        let was_open = !self.closed.send_replace(true);
        if was_open {
            self.permits.close();
            self.client.lock().unwrap_or_else(PoisonError::into_inner).take();
            debug!(endpoint = %self.endpoint, "HTTP session closed");
        }
        was_open
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

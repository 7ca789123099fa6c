//! Immutable connection settings consumed by the transport session

use reqwest::{Method, StatusCode, Url};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::AppConfig;
use crate::shared::error::RpcClientError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POOL_MAX_SIZE: usize = 20;
const DEFAULT_BACKOFF_MAX_SECS: u64 = 120;

/// URL scheme of the node endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Node address and the base URL derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
    url: Url,
}

impl Endpoint {
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Result<Self, RpcClientError> {
        let host = host.into();
        let raw = if host.contains(':') && !host.starts_with('[') {
            // Bare IPv6 literal
            format!("{}://[{}]:{}/", scheme.as_str(), host, port)
        } else {
            format!("{}://{}:{}/", scheme.as_str(), host, port)
        };
        let url = Url::parse(&raw).map_err(|e| {
            RpcClientError::Configuration(format!("Invalid RPC endpoint {}: {}", raw, e))
        })?;

        Ok(Self { scheme, host, port, url })
    }

    /// Parse a full base URL such as `http://127.0.0.1:8332`
    pub fn from_url(raw: &str) -> Result<Self, RpcClientError> {
        let url = Url::parse(raw).map_err(|e| {
            RpcClientError::Configuration(format!("Invalid RPC endpoint {}: {}", raw, e))
        })?;
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(RpcClientError::Configuration(format!(
                    "Unsupported RPC endpoint scheme: {}",
                    other
                )))
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| {
                RpcClientError::Configuration(format!("RPC endpoint has no host: {}", raw))
            })?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| {
                RpcClientError::Configuration(format!("RPC endpoint has no port: {}", raw))
            })?;

        Self::new(scheme, host, port)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

/// HTTP basic auth pair. The password is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// TLS settings for the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPolicy {
    pub enabled: bool,
    pub verify: bool,
    /// PEM file holding the client certificate and its private key
    pub client_cert_path: Option<PathBuf>,
}

impl TlsPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            verify: true,
            client_cert_path: None,
        }
    }

    pub fn is_insecure(&self) -> bool {
        self.enabled && !self.verify
    }
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Transport-level retry discipline.
///
/// `total` counts retries after the first attempt. Application-level JSON-RPC
/// errors are never retried, whatever this policy says.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub total: u32,
    pub backoff_factor: f64,
    pub backoff_max: Duration,
    pub status_forcelist: BTreeSet<u16>,
    pub allowed_methods: BTreeSet<String>,
    pub respect_retry_after: bool,
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            total: 0,
            ..Self::default()
        }
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.allowed_methods.contains(method.as_str())
    }

    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }

    /// Delay before retry number `retry` (1-based): nothing before the first
    /// retry, then `backoff_factor * 2^(retry - 1)` seconds, capped at `backoff_max`.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        if retry <= 1 || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(32) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        if !secs.is_finite() || secs >= self.backoff_max.as_secs_f64() {
            self.backoff_max
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Retry-After statuses honoured when `respect_retry_after` is set
    pub fn honours_retry_after(&self, status: StatusCode) -> bool {
        self.respect_retry_after
            && matches!(
                status,
                StatusCode::PAYLOAD_TOO_LARGE
                    | StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::SERVICE_UNAVAILABLE
            )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 3,
            backoff_factor: 1.0,
            backoff_max: Duration::from_secs(DEFAULT_BACKOFF_MAX_SECS),
            status_forcelist: [429, 500, 502, 503, 504].into_iter().collect(),
            allowed_methods: ["POST".to_string()].into_iter().collect(),
            respect_retry_after: true,
        }
    }
}

/// Everything the session needs, resolved from configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoint: Endpoint,
    pub credentials: Credentials,
    pub tls: TlsPolicy,
    pub retry: RetryPolicy,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Maximum concurrent requests (and idle pooled connections) per session
    pub pool_max_size: usize,
}

impl SessionConfig {
    pub fn new(endpoint: Endpoint, credentials: Credentials) -> Self {
        Self {
            endpoint,
            credentials,
            tls: TlsPolicy::default(),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
        }
    }

    pub fn with_tls(mut self, tls: TlsPolicy) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_pool_max_size(mut self, pool_max_size: usize) -> Self {
        self.pool_max_size = pool_max_size.max(1);
        self
    }
}

impl TryFrom<&AppConfig> for SessionConfig {
    type Error = RpcClientError;

    fn try_from(config: &AppConfig) -> Result<Self, Self::Error> {
        let rpc = &config.rpc;
        let scheme = if rpc.use_ssl { Scheme::Https } else { Scheme::Http };
        let endpoint = Endpoint::new(scheme, rpc.host.clone(), rpc.port)?;

        let tls = TlsPolicy {
            enabled: rpc.use_ssl,
            verify: rpc.ssl_verify,
            client_cert_path: if rpc.use_ssl { rpc.ssl_cert_path.clone() } else { None },
        };

        let retry = RetryPolicy {
            total: config.retry.total,
            backoff_factor: config.retry.backoff_factor,
            status_forcelist: config.retry.status_forcelist.iter().copied().collect(),
            allowed_methods: config
                .retry
                .allowed_methods
                .iter()
                .map(|m| m.to_ascii_uppercase())
                .collect(),
            ..RetryPolicy::default()
        };

        Ok(SessionConfig::new(endpoint, Credentials::new(rpc.user.clone(), rpc.password.clone()))
            .with_tls(tls)
            .with_retry(retry)
            .with_timeout(Duration::from_secs(rpc.timeout_seconds))
            .with_pool_max_size(config.retry.pool_max_size))
    }
}

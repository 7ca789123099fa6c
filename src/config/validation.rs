//! Configuration validation module
//!
//! Checks that go beyond the `validator` derive: host syntax, network name,
//! credentials, certificate file, log level and the retry policy values.

use regex::Regex;
use std::net::IpAddr;
use std::path::Path;
use std::sync::LazyLock;

use crate::config::AppConfig;
use crate::shared::error::{RpcClientError, RpcResult};

static HOSTNAME_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("valid hostname pattern")
});

const NETWORKS: [&str; 3] = ["mainnet", "testnet", "regtest"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const CERT_EXTENSIONS: [&str; 5] = ["pem", "crt", "cer", "p12", "pfx"];
const HTTP_METHODS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"];

/// Configuration validator for additional validation logic
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the complete configuration
    pub fn validate_config(config: &AppConfig) -> RpcResult<()> {
        let rpc = &config.rpc;

        if rpc.user.is_empty() {
            return Err(invalid("RPC user is required"));
        }
        if rpc.password.is_empty() {
            return Err(invalid("RPC password is required"));
        }
        if !Self::is_valid_host(&rpc.host) {
            return Err(invalid(format!("Invalid host: {}", rpc.host)));
        }
        if !Self::is_valid_port(u32::from(rpc.port)) {
            return Err(invalid(format!("Invalid port: {}", rpc.port)));
        }
        if !Self::is_valid_timeout(rpc.timeout_seconds) {
            return Err(invalid(format!("Invalid timeout: {}", rpc.timeout_seconds)));
        }
        if !NETWORKS.contains(&rpc.network.as_str()) {
            return Err(invalid(format!(
                "Invalid network: {}. Must be mainnet, testnet, or regtest",
                rpc.network
            )));
        }
        if let Some(path) = &rpc.ssl_cert_path {
            if !Self::verify_ssl_certificate_path(path) {
                return Err(invalid(format!(
                    "SSL certificate file not found or unsupported: {}",
                    path.display()
                )));
            }
        }

        Self::validate_retry(config)?;

        if !LOG_LEVELS.contains(&config.logging.level.to_ascii_lowercase().as_str()) {
            return Err(invalid(format!(
                "Invalid log level: {}. Must be one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    fn validate_retry(config: &AppConfig) -> RpcResult<()> {
        for method in &config.retry.allowed_methods {
            if !HTTP_METHODS.contains(&method.to_ascii_uppercase().as_str()) {
                return Err(invalid(format!("Invalid retry method: {}", method)));
            }
        }
        for status in &config.retry.status_forcelist {
            if !(100..=599).contains(status) {
                return Err(invalid(format!("Invalid retry status: {}", status)));
            }
        }
        let retries_post = config
            .retry
            .allowed_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case("POST"));
        if config.retry.total > 0 && !retries_post {
            tracing::warn!(
                "Retries configured but POST is not retryable; RPC calls will not be retried"
            );
        }
        Ok(())
    }

    /// IP address or RFC 1123 host name
    pub fn is_valid_host(host: &str) -> bool {
        if host.is_empty() {
            return false;
        }
        if host.parse::<IpAddr>().is_ok() {
            return true;
        }
        host.split('.').all(|label| HOSTNAME_LABEL.is_match(label))
    }

    pub fn is_valid_port(port: u32) -> bool {
        (1..=65535).contains(&port)
    }

    /// 1 second to 5 minutes
    pub fn is_valid_timeout(timeout_seconds: u64) -> bool {
        (1..=300).contains(&timeout_seconds)
    }

    /// Certificate file exists and has a known extension
    pub fn verify_ssl_certificate_path(path: &Path) -> bool {
        let known_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| CERT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        known_extension && path.is_file()
    }
}

fn invalid(message: impl Into<String>) -> RpcClientError {
    RpcClientError::Configuration(message.into())
}

//! Test suite for the Bitcoin RPC client
//!
//! - `common`: mock node, recording observer and request helpers
//! - `unit`: validator, retry policy and error behaviour without I/O
//! - `integration`: full client calls against a mocked node

pub mod common;
pub mod unit;

/// Test configuration and utilities
pub mod config {
    use crate::config::AppConfig;
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Initialize test environment
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("debug")
                .with_test_writer()
                .try_init();
        });
    }

    /// Valid configuration with instant retries
    pub fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.rpc.user = "rpcuser".to_string();
        config.rpc.password = "rpcpassword".to_string();
        config.rpc.timeout_seconds = 5;
        config.retry.backoff_factor = 0.0;
        config
    }

    /// Same configuration, pointed at a mock node
    pub fn test_config_for(uri: &str) -> AppConfig {
        let mut config = test_config();
        let url = reqwest::Url::parse(uri).expect("mock server uri");
        config.rpc.host = url.host_str().unwrap_or("127.0.0.1").to_string();
        config.rpc.port = url.port().unwrap_or(80);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_initialization() {
        config::init();
        let test_config = config::test_config();
        assert!(test_config.validate_config().is_ok());
        assert_eq!(test_config.retry.backoff_factor, 0.0);
    }

    #[test]
    fn test_config_for_mock_uri() {
        let config = config::test_config_for("http://127.0.0.1:40123");
        assert_eq!(config.rpc_url(), "http://127.0.0.1:40123");
    }
}

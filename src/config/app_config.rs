//! Application configuration structures
//!
//! Values are layered: built-in defaults, then an optional config file, then
//! `BITCOIN_RPC_*` environment variables, then Docker secrets for the
//! credentials (unless the matching environment variable is set).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use validator::Validate;

use crate::config::validation::ConfigValidator;
use crate::shared::error::{RpcClientError, RpcResult};

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_NAME: &str = "bitcoin-rpc";

/// Environment variable prefix, e.g. `BITCOIN_RPC_RPC__HOST`
pub const ENV_PREFIX: &str = "BITCOIN_RPC";

/// Default Docker secrets directory
pub const DEFAULT_SECRETS_DIR: &str = "/run/secrets";

const SECRET_SOURCES: [(&str, &str); 2] = [
    ("bitcoin_rpc_user", "BITCOIN_RPC_RPC__USER"),
    ("bitcoin_rpc_password", "BITCOIN_RPC_RPC__PASSWORD"),
];

/// Node connection configuration
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct RpcConfig {
    /// Node host name or IP address
    #[validate(length(min = 1, max = 253))]
    pub host: String,

    /// Node RPC port
    #[validate(range(min = 1))]
    pub port: u16,

    /// RPC username
    pub user: String,

    /// RPC password
    pub password: String,

    /// Per-attempt request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    pub timeout_seconds: u64,

    /// mainnet, testnet or regtest
    pub network: String,

    /// Connect over HTTPS
    pub use_ssl: bool,

    /// Verify the node's certificate
    pub ssl_verify: bool,

    /// Client certificate (PEM with key). Empty means none.
    #[serde(default, deserialize_with = "empty_path_as_none")]
    pub ssl_cert_path: Option<PathBuf>,
}

impl fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("network", &self.network)
            .field("use_ssl", &self.use_ssl)
            .field("ssl_verify", &self.ssl_verify)
            .field("ssl_cert_path", &self.ssl_cert_path)
            .finish()
    }
}

/// Transport retry and pool configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[validate(range(min = 0, max = 10))]
    pub total: u32,

    /// Exponential backoff factor in seconds
    #[validate(range(min = 0.0, max = 60.0))]
    pub backoff_factor: f64,

    /// HTTP statuses that trigger a retry
    #[serde(deserialize_with = "list_or_csv")]
    pub status_forcelist: Vec<u16>,

    /// HTTP methods that may be retried
    #[serde(deserialize_with = "list_or_csv")]
    pub allowed_methods: Vec<String>,

    /// Maximum concurrent requests per session
    #[validate(range(min = 1, max = 256))]
    pub pool_max_size: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level
    #[validate(length(min = 1))]
    pub level: String,

    /// Log format: text or json
    #[validate(length(min = 1))]
    pub format: String,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub rpc: RpcConfig,

    #[validate(nested)]
    pub retry: RetryConfig,

    #[validate(nested)]
    pub logging: LoggingConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8332,
            user: String::new(),
            password: String::new(),
            timeout_seconds: 30,
            network: "mainnet".to_string(),
            use_ssl: false,
            ssl_verify: true,
            ssl_cert_path: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            total: 3,
            backoff_factor: 1.0,
            status_forcelist: vec![429, 500, 502, 503, 504],
            allowed_methods: vec!["POST".to_string()],
            pool_max_size: 20,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, environment and Docker secrets, then validate it
    pub fn load(path: Option<&Path>, secrets_dir: Option<&Path>) -> RpcResult<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(file)
            // Env values stay strings; typed fields convert on deserialize
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| {
                RpcClientError::Configuration(format!("Failed to build configuration: {}", e))
            })?;

        let mut config: AppConfig = settings.try_deserialize().map_err(|e| {
            RpcClientError::Configuration(format!("Failed to deserialize configuration: {}", e))
        })?;

        let secrets_dir = secrets_dir.unwrap_or_else(|| Path::new(DEFAULT_SECRETS_DIR));
        config.apply_docker_secrets(secrets_dir)?;
        config.validate_config()?;

        debug!(config = %config.safe_summary(), "Configuration loaded");
        Ok(config)
    }

    /// Fill credentials from Docker secret files. An environment variable for
    /// the same value wins over the secret.
    pub fn apply_docker_secrets(&mut self, dir: &Path) -> RpcResult<()> {
        for (secret, env_var) in SECRET_SOURCES {
            if std::env::var_os(env_var).is_some_and(|v| !v.is_empty()) {
                continue;
            }
            let path = dir.join(secret);
            if !path.is_file() {
                continue;
            }
            let value = std::fs::read_to_string(&path)
                .map_err(|e| {
                    RpcClientError::Configuration(format!(
                        "Error reading Docker secret {}: {}",
                        path.display(),
                        e
                    ))
                })?
                .trim()
                .to_string();

            debug!(secret = %secret, "Using Docker secret");
            match secret {
                "bitcoin_rpc_user" => self.rpc.user = value,
                _ => self.rpc.password = value,
            }
        }
        Ok(())
    }

    /// Validate the entire configuration
    pub fn validate_config(&self) -> RpcResult<()> {
        self.validate()?;
        ConfigValidator::validate_config(self)
    }

    /// Base URL of the node
    pub fn rpc_url(&self) -> String {
        let scheme = if self.rpc.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.rpc.host, self.rpc.port)
    }

    /// Configuration without credentials, safe for logs
    pub fn safe_summary(&self) -> Value {
        serde_json::json!({
            "host": self.rpc.host,
            "port": self.rpc.port,
            "network": self.rpc.network,
            "use_ssl": self.rpc.use_ssl,
            "ssl_verify": self.rpc.ssl_verify,
            "ssl_cert_path": self.rpc.ssl_cert_path,
            "timeout": self.rpc.timeout_seconds,
            "retries": self.retry.total,
            "log_level": self.logging.level,
            "rpc_url": self.rpc_url(),
        })
    }
}

/// Accept a sequence (config files) or a comma-separated string (environment)
fn list_or_csv<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv<T> {
        List(Vec<T>),
        Csv(String),
    }

    match ListOrCsv::<T>::deserialize(deserializer)? {
        ListOrCsv::List(items) => Ok(items),
        ListOrCsv::Csv(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<T>().map_err(|e| {
                    serde::de::Error::custom(format!("invalid list item {}: {}", item, e))
                })
            })
            .collect(),
    }
}

fn empty_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|path| !path.trim().is_empty()).map(PathBuf::from))
}

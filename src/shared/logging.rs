//! Logging utilities module
//!
//! Installs the global `tracing` subscriber for the binary. The library itself
//! only emits events; it never installs a subscriber.

use tracing_subscriber::{fmt, EnvFilter};

use crate::shared::error::{RpcClientError, RpcResult};

/// Output format of the fmt subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(format: &str) -> RpcResult<Self> {
        match format.to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(RpcClientError::Configuration(format!("Unknown log format: {}", other))),
        }
    }
}

/// Logging utilities for the application
pub struct LoggingUtils;

impl LoggingUtils {
    /// Initialize logging. `RUST_LOG` takes precedence over `level`.
    pub fn initialize(level: &str, format: LogFormat) -> RpcResult<()> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let builder = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_ansi(false);

        let installed = match format {
            LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
            LogFormat::Json => tracing::subscriber::set_global_default(
                builder.json().with_current_span(false).finish(),
            ),
        };

        installed.map_err(|e| {
            RpcClientError::Configuration(format!("Failed to initialize logging: {}", e))
        })
    }
}

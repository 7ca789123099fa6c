//! Configuration management module
//!
//! Loading, validation, and access to the settings the client is built from.

pub mod app_config;
pub mod validation;

pub use app_config::{AppConfig, LoggingConfig, RetryConfig, RpcConfig};
pub use validation::ConfigValidator;

//! Bitcoin RPC Client - a hardened JSON-RPC 2.0 client for Bitcoin Core nodes
//!
//! Outgoing parameters pass a conservative whitelist before anything is sent,
//! the connection is pooled with a bounded retry policy, and every failure is
//! reported through a single classified error type.
//!
//! ```no_run
//! use bitcoin_rpc_client::{AppConfig, RpcClient, TracingObserver};
//! use std::sync::Arc;
//!
//! # async fn run() -> bitcoin_rpc_client::RpcResult<()> {
//! let config = AppConfig::load(None, None)?;
//! let client = RpcClient::from_app_config(&config, Arc::new(TracingObserver))?;
//! let blocks = client.call("getblockcount", vec![]).await?;
//! println!("{}", blocks);
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::{ClientState, NodeInfo, RpcClient};
pub use config::AppConfig;
pub use domain::{InputValidator, ParameterValidator, RpcError};
pub use infrastructure::transport::{
    Credentials, Endpoint, RetryPolicy, Scheme, SessionConfig, TlsPolicy,
};
pub use shared::error::{
    ErrorKind, ProtocolError, RpcClientError, RpcResult, TransportError, ValidationError,
};
pub use shared::observer::{CompositeObserver, NoopObserver, RpcObserver, TracingObserver};
pub use shared::metrics::MetricsObserver;

#[cfg(test)]
mod tests;

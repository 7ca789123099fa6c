//! Shared utilities and common functionality
//!
//! Error taxonomy, logging setup, call observers and metrics used across
//! the other layers.

pub mod error;
pub mod logging;
pub mod metrics;
pub mod observer;

pub use error::{ErrorKind, RpcClientError, RpcResult};
pub use logging::{LogFormat, LoggingUtils};
pub use metrics::MetricsObserver;
pub use observer::{CompositeObserver, NoopObserver, RpcObserver, TracingObserver};

//! Observation hooks for client activity
//!
//! The client never reaches for global state to report what it does; it calls
//! an injected [`RpcObserver`]. [`TracingObserver`] is the default and writes
//! structured `tracing` events.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::shared::error::RpcClientError;

/// Sink for client events. Every hook defaults to doing nothing.
pub trait RpcObserver: Send + Sync {
    fn on_call_started(&self, _method: &str) {}

    fn on_call_succeeded(&self, _method: &str, _elapsed: Duration) {}

    fn on_call_failed(&self, _method: &str, _error: &RpcClientError, _elapsed: Duration) {}

    /// A transport attempt failed and retry number `retry` is about to start after `delay`
    fn on_retry(&self, _retry: u32, _reason: &str, _delay: Duration) {}

    /// Session set up with certificate verification disabled
    fn on_insecure_tls(&self, _endpoint: &str) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RpcObserver for NoopObserver {}

/// Observer that writes `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RpcObserver for TracingObserver {
    fn on_call_started(&self, method: &str) {
        debug!(method = %method, "RPC call started");
    }

    fn on_call_succeeded(&self, method: &str, elapsed: Duration) {
        debug!(
            method = %method,
            duration_ms = elapsed.as_millis() as u64,
            "RPC call successful"
        );
    }

    fn on_call_failed(&self, method: &str, error: &RpcClientError, elapsed: Duration) {
        error!(
            method = %method,
            kind = %error.kind(),
            code = error.code(),
            error = %error,
            duration_ms = elapsed.as_millis() as u64,
            "RPC call failed"
        );
    }

    fn on_retry(&self, retry: u32, reason: &str, delay: Duration) {
        info!(
            retry,
            reason = %reason,
            delay_ms = delay.as_millis() as u64,
            "RPC request failed, retrying"
        );
    }

    fn on_insecure_tls(&self, endpoint: &str) {
        warn!(endpoint = %endpoint, "SSL certificate verification disabled");
    }
}

/// Fans every event out to several observers in order
#[derive(Default, Clone)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn RpcObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn RpcObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl RpcObserver for CompositeObserver {
    fn on_call_started(&self, method: &str) {
        self.observers.iter().for_each(|o| o.on_call_started(method));
    }

    fn on_call_succeeded(&self, method: &str, elapsed: Duration) {
        self.observers.iter().for_each(|o| o.on_call_succeeded(method, elapsed));
    }

    fn on_call_failed(&self, method: &str, error: &RpcClientError, elapsed: Duration) {
        self.observers.iter().for_each(|o| o.on_call_failed(method, error, elapsed));
    }

    fn on_retry(&self, retry: u32, reason: &str, delay: Duration) {
        self.observers.iter().for_each(|o| o.on_retry(retry, reason, delay));
    }

    fn on_insecure_tls(&self, endpoint: &str) {
        self.observers.iter().for_each(|o| o.on_insecure_tls(endpoint));
    }
}

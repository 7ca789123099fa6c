//! Metrics module
//!
//! Prometheus collectors for client activity, fed through the [`RpcObserver`]
//! hooks so the client itself stays unaware of metrics.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

use crate::shared::error::{ErrorKind, RpcClientError};
use crate::shared::observer::RpcObserver;

/// Snapshot of the counters, for display
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub total_calls: u64,
    pub failed_calls: u64,
    pub retries: u64,
    pub in_flight: i64,
}

/// Observer that records prometheus metrics
pub struct MetricsObserver {
    registry: Registry,
    calls_total: IntCounter,
    failures_total: IntCounterVec,
    retries_total: IntCounter,
    insecure_sessions_total: IntCounter,
    in_flight: IntGauge,
    call_duration: Histogram,
}

impl MetricsObserver {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let calls_total = IntCounter::new("rpc_client_calls_total", "Total number of RPC calls")?;
        let failures_total = IntCounterVec::new(
            Opts::new("rpc_client_failures_total", "Failed RPC calls by error kind"),
            &["kind"],
        )?;
        let retries_total = IntCounter::new("rpc_client_retries_total", "Transport-level retries")?;
        let insecure_sessions_total = IntCounter::new(
            "rpc_client_insecure_sessions_total",
            "Sessions created with certificate verification disabled",
        )?;
        let in_flight = IntGauge::new("rpc_client_in_flight", "RPC calls currently in flight")?;
        let call_duration = Histogram::with_opts(HistogramOpts::new(
            "rpc_client_call_duration_seconds",
            "RPC call duration in seconds",
        ))?;

        registry.register(Box::new(calls_total.clone()))?;
        registry.register(Box::new(failures_total.clone()))?;
        registry.register(Box::new(retries_total.clone()))?;
        registry.register(Box::new(insecure_sessions_total.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;
        registry.register(Box::new(call_duration.clone()))?;

        Ok(Self {
            registry,
            calls_total,
            failures_total,
            retries_total,
            insecure_sessions_total,
            in_flight,
            call_duration,
        })
    }

    pub fn failures(&self, kind: ErrorKind) -> u64 {
        self.failures_total.with_label_values(&[kind.as_str()]).get()
    }

    pub fn summary(&self) -> MetricsSummary {
        let failed_calls = [
            ErrorKind::Configuration,
            ErrorKind::Validation,
            ErrorKind::Transport,
            ErrorKind::Protocol,
            ErrorKind::Application,
        ]
        .into_iter()
        .map(|kind| self.failures(kind))
        .sum();

        MetricsSummary {
            total_calls: self.calls_total.get(),
            failed_calls,
            retries: self.retries_total.get(),
            in_flight: self.in_flight.get(),
        }
    }

    /// Metrics in the prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl RpcObserver for MetricsObserver {
    fn on_call_started(&self, _method: &str) {
        self.calls_total.inc();
        self.in_flight.inc();
    }

    fn on_call_succeeded(&self, _method: &str, elapsed: Duration) {
        self.in_flight.dec();
        self.call_duration.observe(elapsed.as_secs_f64());
    }

    fn on_call_failed(&self, _method: &str, error: &RpcClientError, elapsed: Duration) {
        self.in_flight.dec();
        self.call_duration.observe(elapsed.as_secs_f64());
        self.failures_total.with_label_values(&[error.kind().as_str()]).inc();
    }

    fn on_retry(&self, _retry: u32, _reason: &str, _delay: Duration) {
        self.retries_total.inc();
    }

    fn on_insecure_tls(&self, _endpoint: &str) {
        self.insecure_sessions_total.inc();
    }
}

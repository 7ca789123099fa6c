//! Common test utilities and mock implementations
//!
//! [`MockNode`] wraps a wiremock server that answers like a Bitcoin Core
//! node, echoing the request id back. [`RecordingObserver`] captures every
//! observer hook so tests can assert on what the client reported.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use crate::application::RpcClient;
use crate::infrastructure::transport::{Credentials, Endpoint, RetryPolicy, SessionConfig};
use crate::shared::error::{ErrorKind, RpcClientError};
use crate::shared::observer::RpcObserver;

pub const TEST_USER: &str = "rpcuser";
pub const TEST_PASSWORD: &str = "rpcpassword";

/// Responder that wraps `result` or `error` in an envelope carrying the request's id
pub struct EchoId {
    result: Option<Value>,
    error: Option<Value>,
    delay: Option<Duration>,
}

impl EchoId {
    pub fn result(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
            delay: None,
        }
    }

    pub fn error(code: i64, message: &str) -> Self {
        Self {
            result: None,
            error: Some(json!({ "code": code, "message": message })),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Respond for EchoId {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = serde_json::from_slice::<Value>(&request.body)
            .ok()
            .and_then(|body| body.get("id").cloned())
            .unwrap_or(Value::Null);

        let body = json!({
            "result": self.result.clone().unwrap_or(Value::Null),
            "error": self.error.clone().unwrap_or(Value::Null),
            "id": id,
        });

        let template = ResponseTemplate::new(200).set_body_json(body);
        match self.delay {
            Some(delay) => template.set_delay(delay),
            None => template,
        }
    }
}

/// Mock Bitcoin Core node
pub struct MockNode {
    pub server: MockServer,
}

impl MockNode {
    pub async fn start() -> Self {
        crate::tests::config::init();
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Answer `rpc_method` with `result`
    pub async fn mount_result(&self, rpc_method: &str, result: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(EchoId::result(result))
            .mount(&self.server)
            .await;
    }

    /// Answer `rpc_method` with a JSON-RPC error object
    pub async fn mount_error(&self, rpc_method: &str, code: i64, message: &str) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(EchoId::error(code, message))
            .mount(&self.server)
            .await;
    }

    /// Answer any request with a bare HTTP status
    pub async fn mount_status(&self, status: u16) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("status body"))
            .mount(&self.server)
            .await;
    }

    /// Every JSON-RPC body the node received, in order
    pub async fn received_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }

    pub fn session_config(&self, retry: RetryPolicy) -> SessionConfig {
        let endpoint = Endpoint::from_url(&self.uri()).expect("mock server uri");
        SessionConfig::new(endpoint, Credentials::new(TEST_USER, TEST_PASSWORD))
            .with_retry(retry)
            .with_timeout(Duration::from_secs(5))
    }

    /// Client with instant retries, reporting to `observer`
    pub fn client(&self, observer: Arc<dyn RpcObserver>) -> RpcClient {
        RpcClient::with_observer(self.session_config(instant_retries(3)), observer).expect("client")
    }
}

/// Default retry policy without any sleeping
pub fn instant_retries(total: u32) -> RetryPolicy {
    RetryPolicy {
        total,
        backoff_factor: 0.0,
        ..RetryPolicy::default()
    }
}

/// Observer that records every hook it receives
#[derive(Default)]
pub struct RecordingObserver {
    started: Mutex<Vec<String>>,
    succeeded: Mutex<Vec<String>>,
    failed: Mutex<Vec<(String, ErrorKind)>>,
    retries: Mutex<Vec<(u32, Duration)>>,
    insecure: AtomicU32,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn succeeded(&self) -> Vec<String> {
        self.succeeded.lock().unwrap().clone()
    }

    pub fn failed(&self) -> Vec<(String, ErrorKind)> {
        self.failed.lock().unwrap().clone()
    }

    pub fn retries(&self) -> Vec<(u32, Duration)> {
        self.retries.lock().unwrap().clone()
    }

    pub fn insecure_warnings(&self) -> u32 {
        self.insecure.load(Ordering::SeqCst)
    }
}

impl RpcObserver for RecordingObserver {
    fn on_call_started(&self, method: &str) {
        self.started.lock().unwrap().push(method.to_string());
    }

    fn on_call_succeeded(&self, method: &str, _elapsed: Duration) {
        self.succeeded.lock().unwrap().push(method.to_string());
    }

    fn on_call_failed(&self, method: &str, error: &RpcClientError, _elapsed: Duration) {
        self.failed.lock().unwrap().push((method.to_string(), error.kind()));
    }

    fn on_retry(&self, retry: u32, _reason: &str, delay: Duration) {
        self.retries.lock().unwrap().push((retry, delay));
    }

    fn on_insecure_tls(&self, _endpoint: &str) {
        self.insecure.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sample `getblockchaininfo` result
pub fn blockchain_info() -> Value {
    json!({
        "chain": "main",
        "blocks": 850000,
        "headers": 850000,
        "bestblockhash": "00000000000000000002a7c4c1e48d76c5a37902165a270156b7a8d72728a054",
        "difficulty": 83148355189239.77,
        "verificationprogress": 0.9999987,
        "pruned": false
    })
}

/// Sample `getnetworkinfo` result
pub fn network_info() -> Value {
    json!({
        "version": 270000,
        "subversion": "/Satoshi:27.0.0/",
        "protocolversion": 70016,
        "connections": 10,
        "networkactive": true
    })
}

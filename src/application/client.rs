//! RPC client - the single call surface used by command layers
//!
//! [`RpcClient::call`] validates the outgoing method and parameters, wraps them
//! in a JSON-RPC 2.0 envelope, hands the body to the [`TransportSession`] and
//! turns whatever comes back into either the decoded `result` or a classified
//! [`RpcClientError`].

use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::application::node_info::NodeInfo;
use crate::config::AppConfig;
use crate::domain::rpc::{JsonRpcRequest, RpcError};
use crate::domain::validation::ParameterValidator;
use crate::infrastructure::transport::{HttpResponse, SessionConfig, TransportSession};
use crate::shared::error::{ProtocolError, RpcClientError, RpcResult};
use crate::shared::observer::{RpcObserver, TracingObserver};

/// Method used for connectivity checks; available on every node
pub const DIAGNOSTIC_METHOD: &str = "getblockchaininfo";

/// Method used for the network half of [`RpcClient::get_node_info`]
pub const NETWORK_STATUS_METHOD: &str = "getnetworkinfo";

/// Lifecycle of a client. A constructed client starts in `SessionReady`;
/// `Closed` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    SessionReady,
    Closed,
}

/// JSON-RPC client for a Bitcoin Core compatible node.
///
/// The client owns its transport session. Dropping the client closes the
/// session, so the pool is released on every exit path; [`RpcClient::close`]
/// may also be called explicitly, any number of times.
pub struct RpcClient {
    session: TransportSession,
    timeout: Duration,
    observer: Arc<dyn RpcObserver>,
}

impl RpcClient {
    /// Create a client that reports through [`TracingObserver`]
    pub fn new(config: SessionConfig) -> RpcResult<Self> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    pub fn with_observer(config: SessionConfig, observer: Arc<dyn RpcObserver>) -> RpcResult<Self> {
        let session = TransportSession::new(&config, observer.clone())?;
        Ok(Self {
            session,
            timeout: config.timeout,
            observer,
        })
    }

    pub fn from_app_config(config: &AppConfig, observer: Arc<dyn RpcObserver>) -> RpcResult<Self> {
        Self::with_observer(SessionConfig::try_from(config)?, observer)
    }

    pub fn state(&self) -> ClientState {
        if self.session.is_closed() {
            ClientState::Closed
        } else {
            ClientState::SessionReady
        }
    }

    pub fn endpoint(&self) -> String {
        self.session.endpoint().to_string()
    }

    /// Call `method` with positional `params` and return the node's `result`.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        let started = Instant::now();
        self.observer.on_call_started(method);

        let result = self.execute(method, params).await;

        match &result {
            Ok(_) => self.observer.on_call_succeeded(method, started.elapsed()),
            Err(err) => self.observer.on_call_failed(method, err, started.elapsed()),
        }
        result
    }

    async fn execute(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        if self.session.is_closed() {
            return Err(RpcClientError::Configuration("RPC client session is closed".to_string()));
        }

        ParameterValidator::validate_method_name(method)?;
        let params = if params.is_empty() {
            params
        } else {
            ParameterValidator::validate(params)?
        };

        let request = JsonRpcRequest::new(method, params);
        debug!(method = %request.method, id = request.id, params = ?request.params, "RPC call");

        let body = request.to_bytes().map_err(|e| {
            RpcClientError::Configuration(format!("Failed to encode request: {}", e))
        })?;

        let response = self.session.send(body, self.timeout).await?;
        interpret_response(request.id, response)
    }

    /// Check that the node answers the diagnostic method. Errors are returned, not swallowed.
    pub async fn test_connection(&self) -> RpcResult<bool> {
        match self.call(DIAGNOSTIC_METHOD, Vec::new()).await {
            Ok(_) => {
                info!(endpoint = %self.session.endpoint(), "Connection test successful");
                Ok(true)
            }
            Err(err) => {
                error!(endpoint = %self.session.endpoint(), error = %err, "Connection test failed");
                Err(err)
            }
        }
    }

    /// Summary of chain and network state, from two sequential calls
    pub async fn get_node_info(&self) -> RpcResult<NodeInfo> {
        let blockchain_info = self.call(DIAGNOSTIC_METHOD, Vec::new()).await?;
        let network_info = self.call(NETWORK_STATUS_METHOD, Vec::new()).await?;
        Ok(NodeInfo::from_results(&blockchain_info, &network_info))
    }

    /// Release the session. Safe to call repeatedly; in-flight calls fail with
    /// a transport error and later calls with a configuration error.
    pub fn close(&self) {
        if self.session.close() {
            debug!("RPC session closed");
        }
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Turn an HTTP response into the call's result.
///
/// Non-2xx statuses fail before any decoding. A non-null `error` member wins
/// over `result` when a node sends both.
fn interpret_response(request_id: u64, response: HttpResponse) -> RpcResult<Value> {
    if !response.status.is_success() {
        let status = response.status.as_u16();
        error!(status, "HTTP error from RPC endpoint");
        return Err(ProtocolError::from_status(status, response.text()).into());
    }

    let body: Value = serde_json::from_slice(&response.body).map_err(|e| {
        error!(error = %e, "Invalid JSON response");
        ProtocolError::InvalidJson { body: response.text() }
    })?;

    let Value::Object(mut envelope) = body else {
        let reason = "response is not a JSON object".to_string();
        return Err(ProtocolError::MalformedResponse(reason).into());
    };

    match envelope.get("id") {
        Some(id) if id.as_u64() == Some(request_id) => {}
        other => warn!(
            expected = request_id,
            received = ?other,
            "RPC response id does not match request"
        ),
    }

    if let Some(error) = envelope.remove("error").filter(|e| !e.is_null()) {
        return Err(RpcError::from_error_member(&error).into());
    }

    envelope.remove("result").ok_or_else(|| {
        let reason = "response carries neither result nor error".to_string();
        ProtocolError::MalformedResponse(reason).into()
    })
}

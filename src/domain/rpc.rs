//! JSON-RPC wire model - requests sent to the node and the error object it returns

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Protocol version tag sent with every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Reserved code for an undecodable response body
pub const PARSE_ERROR_CODE: i64 = -32700;

/// Reserved code for rejected parameters
pub const INVALID_PARAMS_CODE: i64 = -32602;

/// Code used when neither the protocol nor the node supplies one
pub const GENERIC_ERROR_CODE: i64 = -1;

static LAST_REQUEST_ID: AtomicU64 = AtomicU64::new(0);

/// Next request identifier: the current time in microseconds, bumped when
/// needed so that ids handed out by this process strictly increase.
pub fn next_request_id() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64;

    let mut last = LAST_REQUEST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_REQUEST_ID.compare_exchange_weak(
            last,
            candidate,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}

/// Outgoing JSON-RPC request. Built fresh for every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: next_request_id(),
            method: method.into(),
            params,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Error object returned by the node, kept exactly as received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code
    pub code: i64,

    /// Error message
    pub message: String,

    /// Additional error data, `null` when absent
    #[serde(default)]
    pub data: Value,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// Build from the `error` member of a response.
    ///
    /// Missing members fall back to code `-1`, message `"Unknown RPC error"` and
    /// `null` data. A bare string is taken as the message.
    pub fn from_error_member(error: &Value) -> Self {
        match error {
            Value::Object(obj) => {
                let code = obj.get("code").and_then(Value::as_i64).unwrap_or(GENERIC_ERROR_CODE);
                let message = obj
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown RPC error")
                    .to_string();
                let data = obj.get("data").cloned().unwrap_or(Value::Null);
                Self::new(code, message, data)
            }
            Value::String(message) => Self::new(GENERIC_ERROR_CODE, message.clone(), Value::Null),
            other => Self::new(GENERIC_ERROR_CODE, "Unknown RPC error", other.clone()),
        }
    }
}

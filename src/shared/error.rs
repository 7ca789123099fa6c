//! Error handling module
//!
//! Every failure that reaches a caller of the RPC client is an [`RpcClientError`].
//! The five variants keep configuration, validation, transport, protocol and
//! application failures apart so callers can branch on the category while the
//! original message from the node is carried through untouched.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::domain::rpc::{RpcError, GENERIC_ERROR_CODE, INVALID_PARAMS_CODE, PARSE_ERROR_CODE};

/// Category of an [`RpcClientError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Validation,
    Transport,
    Protocol,
    Application,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Validation => "validation",
            ErrorKind::Transport => "transport",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Application => "application",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outgoing parameter or method name rejected before any network I/O
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid characters in parameter: {value}")]
    InvalidCharacters { value: String },

    #[error("Invalid method name '{method}': {reason}")]
    InvalidMethodName { method: String, reason: String },

    #[error("Invalid {what}: {value}")]
    InvalidValue { what: &'static str, value: String },
}

/// Failure to complete the HTTP exchange
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Cannot connect to Bitcoin node at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Request timeout after {} seconds", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    #[error("Request failed after {attempts} attempts, last HTTP status {status}")]
    RetriesExhausted { attempts: u32, status: u16 },

    #[error("RPC session is closed")]
    Closed,

    #[error("Request failed: {0}")]
    Request(String),
}

/// Well-formed HTTP exchange whose response could not be accepted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Access forbidden")]
    AccessForbidden,

    #[error("RPC endpoint not found")]
    EndpointNotFound,

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid JSON response: {body}")]
    InvalidJson { body: String },

    #[error("Malformed JSON-RPC response: {0}")]
    MalformedResponse(String),
}

impl ProtocolError {
    /// Map a non-success HTTP status to its protocol error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => ProtocolError::AuthenticationFailed,
            403 => ProtocolError::AccessForbidden,
            404 => ProtocolError::EndpointNotFound,
            _ => ProtocolError::HttpStatus { status, body },
        }
    }
}

/// Classified error returned by every client operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcClientError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid parameters: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Bitcoin RPC Error {}: {}", .0.code, .0.message)]
    Application(RpcError),
}

impl RpcClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcClientError::Configuration(_) => ErrorKind::Configuration,
            RpcClientError::Validation(_) => ErrorKind::Validation,
            RpcClientError::Transport(_) => ErrorKind::Transport,
            RpcClientError::Protocol(_) => ErrorKind::Protocol,
            RpcClientError::Application(_) => ErrorKind::Application,
        }
    }

    /// Numeric code; application errors keep the code sent by the node
    pub fn code(&self) -> i64 {
        match self {
            RpcClientError::Validation(_) => INVALID_PARAMS_CODE,
            RpcClientError::Protocol(ProtocolError::InvalidJson { .. }) => PARSE_ERROR_CODE,
            RpcClientError::Application(err) => err.code,
            _ => GENERIC_ERROR_CODE,
        }
    }

    /// Message without the category prefix. Application messages are verbatim.
    pub fn message(&self) -> String {
        match self {
            RpcClientError::Configuration(msg) => msg.clone(),
            RpcClientError::Validation(err) => format!("Invalid parameters: {}", err),
            RpcClientError::Transport(err) => err.to_string(),
            RpcClientError::Protocol(err) => err.to_string(),
            RpcClientError::Application(err) => err.message.clone(),
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            RpcClientError::Application(err) if !err.data.is_null() => Some(&err.data),
            _ => None,
        }
    }

    /// Render as a JSON object suitable for printing or forwarding as-is
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "kind": self.kind(),
            "code": self.code(),
            "message": self.message(),
            "data": self.data().cloned().unwrap_or(Value::Null),
        })
    }
}

impl From<RpcError> for RpcClientError {
    fn from(err: RpcError) -> Self {
        RpcClientError::Application(err)
    }
}

impl From<config::ConfigError> for RpcClientError {
    fn from(err: config::ConfigError) -> Self {
        RpcClientError::Configuration(err.to_string())
    }
}

impl From<validator::ValidationErrors> for RpcClientError {
    fn from(err: validator::ValidationErrors) -> Self {
        RpcClientError::Configuration(format!("Configuration validation failed: {}", err))
    }
}

/// Client result type
pub type RpcResult<T> = Result<T, RpcClientError>;

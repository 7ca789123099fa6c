//! Domain layer - JSON-RPC envelopes and parameter rules
//!
//! Pure types and checks with no I/O.

pub mod rpc;
pub mod validation;

pub use rpc::{JsonRpcRequest, RpcError};
pub use validation::{InputValidator, ParameterValidator};

//! Application layer - the RPC client and the calls built on top of it

pub mod client;
pub mod node_info;

pub use client::{ClientState, RpcClient};
pub use node_info::NodeInfo;

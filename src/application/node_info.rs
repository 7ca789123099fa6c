//! Node summary assembled from the diagnostic calls

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed subset of `getblockchaininfo` and `getnetworkinfo`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub chain: Option<String>,
    pub blocks: Option<u64>,
    pub bestblockhash: Option<String>,
    pub version: Option<i64>,
    pub subversion: Option<String>,
    pub connections: Option<u64>,
}

impl NodeInfo {
    /// Pick the summary fields out of the two results. Missing or mistyped
    /// members are left empty.
    pub fn from_results(blockchain_info: &Value, network_info: &Value) -> Self {
        Self {
            chain: string_field(blockchain_info, "chain"),
            blocks: blockchain_info.get("blocks").and_then(Value::as_u64),
            bestblockhash: string_field(blockchain_info, "bestblockhash"),
            version: network_info.get("version").and_then(Value::as_i64),
            subversion: string_field(network_info, "subversion"),
            connections: network_info.get("connections").and_then(Value::as_u64),
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

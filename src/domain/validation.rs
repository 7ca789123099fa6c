//! Validation of outgoing RPC input
//!
//! [`ParameterValidator`] guards the client boundary: every string parameter is
//! checked against a restricted character class before it is serialized, and
//! method names are checked before a request is built. [`InputValidator`]
//! carries the domain checks (block hashes, heights, addresses, txids) that
//! command layers run before shaping their parameters.
//!
//! Arrays and objects inside a parameter list are passed through without
//! looking inside them. Nested values are not sanitized.

use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha512};
use std::sync::LazyLock;

use crate::shared::error::ValidationError;

static SAFE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\-_./:]+$").expect("valid parameter pattern"));

static HEX_256: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").expect("valid hash pattern"));

static ADDRESS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Legacy P2PKH and P2SH
        r"^[13][a-km-zA-HJ-NP-Z1-9]{25,34}$",
        // Bech32
        r"^bc1[a-z0-9]{39,59}$",
        // Testnet bech32
        r"^tb1[a-z0-9]{39,59}$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid address pattern"))
    .collect()
});

const MAX_METHOD_NAME_LEN: usize = 100;

/// Sanitizer for JSON-RPC parameters and method names
pub struct ParameterValidator;

impl ParameterValidator {
    /// Check a single parameter.
    ///
    /// Strings must consist of ASCII alphanumerics and `-_./:` only; numbers,
    /// booleans and null are returned unchanged, as are arrays and objects.
    pub fn sanitize(param: Value) -> Result<Value, ValidationError> {
        match param {
            Value::String(s) => {
                if SAFE_PARAM.is_match(&s) {
                    Ok(Value::String(s))
                } else {
                    Err(ValidationError::InvalidCharacters { value: s })
                }
            }
            other => Ok(other),
        }
    }

    /// Sanitize every element of an ordered parameter list, failing on the first bad one
    pub fn validate(params: Vec<Value>) -> Result<Vec<Value>, ValidationError> {
        params.into_iter().map(Self::sanitize).collect()
    }

    /// Validate a JSON-RPC method name
    pub fn validate_method_name(method: &str) -> Result<(), ValidationError> {
        let reason = if method.is_empty() {
            "method name cannot be empty"
        } else if method.len() > MAX_METHOD_NAME_LEN {
            "method name too long (max 100 characters)"
        } else if !method.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            "method name contains invalid characters"
        } else {
            return Ok(());
        };

        Err(ValidationError::InvalidMethodName {
            method: method.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// Domain checks for user supplied values
pub struct InputValidator;

impl InputValidator {
    /// 64 character hex string
    pub fn is_valid_block_hash(block_hash: &str) -> bool {
        HEX_256.is_match(block_hash)
    }

    /// Transaction ids share the block hash format
    pub fn is_valid_transaction_id(txid: &str) -> bool {
        HEX_256.is_match(txid)
    }

    /// Non-negative integer given as a JSON number or a decimal string
    pub fn is_valid_block_height(height: &Value) -> bool {
        Self::block_height(height).is_some()
    }

    /// Basic pattern check for legacy, bech32 and testnet bech32 addresses
    pub fn is_valid_bitcoin_address(address: &str) -> bool {
        ADDRESS_PATTERNS.iter().any(|pattern| pattern.is_match(address))
    }

    /// Lowercase hex SHA-512 digest of the UTF-8 bytes of `data`
    pub fn hash_with_sha512(data: &str) -> String {
        hex::encode(Sha512::digest(data.as_bytes()))
    }

    fn block_height(height: &Value) -> Option<u64> {
        match height {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
    }
}

pub fn validate_block_hash(block_hash: &str) -> Result<&str, ValidationError> {
    if InputValidator::is_valid_block_hash(block_hash) {
        Ok(block_hash)
    } else {
        Err(invalid("block hash", block_hash))
    }
}

pub fn validate_block_height(height: &Value) -> Result<u64, ValidationError> {
    InputValidator::block_height(height).ok_or_else(|| invalid("block height", &height.to_string()))
}

pub fn validate_bitcoin_address(address: &str) -> Result<&str, ValidationError> {
    if InputValidator::is_valid_bitcoin_address(address) {
        Ok(address)
    } else {
        Err(invalid("Bitcoin address", address))
    }
}

pub fn validate_transaction_id(txid: &str) -> Result<&str, ValidationError> {
    if InputValidator::is_valid_transaction_id(txid) {
        Ok(txid)
    } else {
        Err(invalid("transaction ID", txid))
    }
}

fn invalid(what: &'static str, value: &str) -> ValidationError {
    ValidationError::InvalidValue {
        what,
        value: value.to_string(),
    }
}

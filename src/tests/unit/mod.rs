//! Unit tests that cut across modules
//!
//! Per-module behaviour is tested next to the code; these cover the
//! character whitelist as a whole, configuration feeding the transport policy,
//! and the error surface callers see.

use serde_json::{json, Value};
use std::time::Duration;

use crate::domain::rpc::RpcError;
use crate::domain::validation::{validate_block_height, InputValidator, ParameterValidator};
use crate::infrastructure::transport::{Scheme, SessionConfig};
use crate::shared::error::{
    ErrorKind, ProtocolError, RpcClientError, TransportError, ValidationError,
};
use crate::tests::config::test_config;

fn is_whitelisted(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':')
}

#[test]
fn test_every_ascii_character_against_whitelist() {
    for byte in 0u8..=127 {
        let c = byte as char;
        let param = Value::String(format!("abc{}def", c));
        let result = ParameterValidator::sanitize(param.clone());

        if is_whitelisted(c) {
            assert_eq!(result.unwrap(), param, "{:?} should be accepted", c);
        } else {
            assert_eq!(
                result.unwrap_err(),
                ValidationError::InvalidCharacters {
                    value: format!("abc{}def", c)
                },
                "{:?} should be rejected",
                c
            );
        }
    }
}

#[test]
fn test_non_ascii_rejected() {
    for value in ["héllo", "block٣", "tx\u{200b}id", "ـ"] {
        assert!(
            ParameterValidator::sanitize(json!(value)).is_err(),
            "{} should be rejected",
            value
        );
    }
}

#[test]
fn test_typical_bitcoin_parameters_pass() {
    let params = vec![
        json!("000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"),
        json!(2),
        json!("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"),
        json!("wallet/default.dat"),
        json!(true),
        json!(null),
        json!(0.0001),
    ];
    assert_eq!(ParameterValidator::validate(params.clone()).unwrap(), params);
}

#[test]
fn test_nested_values_pass_unchecked() {
    let params = vec![json!(["no spaces allowed? they are here"]), json!({"label": "a;b"})];
    assert_eq!(ParameterValidator::validate(params.clone()).unwrap(), params);
}

#[test]
fn test_input_helpers_agree_with_validator() {
    let hash = "00000000000000000002a7c4c1e48d76c5a37902165a270156b7a8d72728a054";
    assert!(InputValidator::is_valid_block_hash(hash));
    assert!(ParameterValidator::sanitize(json!(hash)).is_ok());
    assert_eq!(validate_block_height(&json!(850000)).unwrap(), 850000);
    assert!(validate_block_height(&json!(-1)).is_err());
}

#[test]
fn test_session_config_follows_app_config() {
    let mut config = test_config();
    config.rpc.use_ssl = true;
    config.rpc.ssl_verify = false;
    config.rpc.timeout_seconds = 12;
    config.retry.total = 5;
    config.retry.allowed_methods = vec!["post".to_string(), "get".to_string()];
    config.retry.pool_max_size = 4;

    let session = SessionConfig::try_from(&config).unwrap();
    assert_eq!(session.endpoint.scheme(), Scheme::Https);
    assert_eq!(session.endpoint.to_string(), "https://127.0.0.1:8332");
    assert!(session.tls.is_insecure());
    assert_eq!(session.timeout, Duration::from_secs(12));
    assert_eq!(session.retry.total, 5);
    assert!(session.retry.allows_method(&reqwest::Method::POST));
    assert!(session.retry.allows_method(&reqwest::Method::GET));
    assert_eq!(session.pool_max_size, 4);
    assert_eq!(session.credentials.username(), "rpcuser");
}

#[test]
fn test_error_surface_per_kind() {
    let cases: Vec<(RpcClientError, ErrorKind, i64)> = vec![
        (RpcClientError::Configuration("bad".to_string()), ErrorKind::Configuration, -1),
        (
            ValidationError::InvalidCharacters {
                value: "a b".to_string(),
            }
            .into(),
            ErrorKind::Validation,
            -32602,
        ),
        (
            TransportError::Timeout { timeout: Duration::from_secs(30) }.into(),
            ErrorKind::Transport,
            -1,
        ),
        (ProtocolError::AuthenticationFailed.into(), ErrorKind::Protocol, -1),
        (
            ProtocolError::InvalidJson {
                body: "<html>".to_string(),
            }
            .into(),
            ErrorKind::Protocol,
            -32700,
        ),
        (RpcError::new(-5, "Block not found", Value::Null).into(), ErrorKind::Application, -5),
    ];

    for (error, kind, code) in cases {
        assert_eq!(error.kind(), kind, "{}", error);
        assert_eq!(error.code(), code, "{}", error);

        let payload = error.to_json();
        assert_eq!(payload["kind"], json!(kind.as_str()));
        assert_eq!(payload["code"], json!(code));
        assert_eq!(payload["message"], json!(error.message()));
    }
}

#[test]
fn test_validation_message_names_offending_value() {
    let err: RpcClientError = ParameterValidator::validate(vec![json!("ok"), json!("rm -rf /")])
        .unwrap_err()
        .into();
    assert_eq!(err.to_string(), "Invalid parameters: Invalid characters in parameter: rm -rf /");
}

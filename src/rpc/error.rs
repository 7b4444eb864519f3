// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway failure taxonomy.
//!
//! Every failure the proxy pipeline can produce maps to a JSON-RPC error
//! code and serializes into the standard error envelope. RPC-level failures
//! are always delivered over HTTP 200; only pre-RPC transport problems
//! (empty body, wrong content type) surface as plain 4xx responses.

use serde_json::Value;

use super::{ErrorObject, RpcResponse, JSONRPC_VERSION};

/// General errors that originate inside the gateway.
pub const CODE_INTERNAL: i64 = -32080;
/// Otherwise-unspecified errors relayed from the SDK.
pub const CODE_SDK: i64 = -32603;
/// Auth info is required but was not provided.
pub const CODE_AUTH_REQUIRED: i64 = -32084;
/// Auth info was provided but rejected.
pub const CODE_FORBIDDEN: i64 = -32085;
/// Invalid JSON was received from the client.
pub const CODE_JSON_PARSE: i64 = -32700;
/// Error in params supplied by the client.
pub const CODE_INVALID_PARAMS: i64 = -32602;
/// The requested method is not allowed to be called.
pub const CODE_METHOD_NOT_ALLOWED: i64 = -32601;

/// Message for the case where auth info is required but absent.
/// This is NOT the message for auth info that was provided but is wrong.
pub const AUTH_REQUIRED_MESSAGE: &str = "authentication required";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    #[error("{0}")]
    JsonParse(String),
    #[error("{0}")]
    MethodNotAllowed(String),
    #[error("{0}")]
    InvalidParams(String),
    #[error("{0}")]
    Sdk(String),
    #[error("{0}")]
    Internal(String),
    #[error("authentication required")]
    AuthRequired,
    #[error("{0}")]
    Forbidden(String),
}

impl ProxyError {
    pub fn code(&self) -> i64 {
        match self {
            ProxyError::JsonParse(_) => CODE_JSON_PARSE,
            ProxyError::MethodNotAllowed(_) => CODE_METHOD_NOT_ALLOWED,
            ProxyError::InvalidParams(_) => CODE_INVALID_PARAMS,
            ProxyError::Sdk(_) => CODE_SDK,
            ProxyError::Internal(_) => CODE_INTERNAL,
            ProxyError::AuthRequired => CODE_AUTH_REQUIRED,
            ProxyError::Forbidden(_) => CODE_FORBIDDEN,
        }
    }

    /// Failure-kind label attached to the failed-call metric.
    pub fn failure_kind(&self) -> &'static str {
        match self {
            ProxyError::JsonParse(_) => crate::metrics::FAILURE_KIND_CLIENT_JSON,
            ProxyError::AuthRequired | ProxyError::Forbidden(_) => {
                crate::metrics::FAILURE_KIND_AUTH
            }
            ProxyError::Sdk(_) => crate::metrics::FAILURE_KIND_RPC,
            _ => crate::metrics::FAILURE_KIND_INTERNAL,
        }
    }

    /// Build the error envelope for the client, echoing the request id.
    pub fn into_response(self, id: Value) -> RpcResponse {
        RpcResponse {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(ErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn codes_match_the_wire_contract() {
        assert_eq!(ProxyError::JsonParse("x".into()).code(), -32700);
        assert_eq!(ProxyError::MethodNotAllowed("x".into()).code(), -32601);
        assert_eq!(ProxyError::InvalidParams("x".into()).code(), -32602);
        assert_eq!(ProxyError::Sdk("x".into()).code(), -32603);
        assert_eq!(ProxyError::Internal("x".into()).code(), -32080);
        assert_eq!(ProxyError::AuthRequired.code(), -32084);
        assert_eq!(ProxyError::Forbidden("x".into()).code(), -32085);
    }

    #[test]
    fn auth_required_carries_the_fixed_message() {
        assert_eq!(ProxyError::AuthRequired.to_string(), "authentication required");
    }

    #[test]
    fn into_response_echoes_request_id() {
        let res = ProxyError::MethodNotAllowed("forbidden method".into()).into_response(json!(42));
        assert_eq!(res.id, json!(42));
        assert_eq!(res.jsonrpc, "2.0");
        let err = res.error.unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "forbidden method");
        assert!(res.result.is_none());
    }
}

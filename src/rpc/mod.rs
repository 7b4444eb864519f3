// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC 2.0 envelope types shared by the client-facing endpoint and the
//! outbound SDK client.
//!
//! The gateway never terminates JSON-RPC itself. Requests are parsed just
//! enough to apply method policy and parameter injection, then forwarded
//! verbatim; responses travel back untouched except for documented
//! post-processing.

pub mod client;
pub mod error;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Protocol version string carried by every request and response.
pub const JSONRPC_VERSION: &str = "2.0";

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_string()
}

/// Request parameters as they appear on the wire.
///
/// Positional params survive parsing so they can be forwarded for methods
/// the gateway does not inspect, but any method whose policy reads params
/// by name rejects them.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    Absent,
    ByName(Map<String, Value>),
    ByPosition(Vec<Value>),
}

impl Params {
    pub fn is_absent(&self) -> bool {
        matches!(self, Params::Absent)
    }

    /// Named params, or `None` for absent/positional params.
    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        match self {
            Params::ByName(map) => Some(map),
            _ => None,
        }
    }

    /// Params as a JSON value, for canonical cache keys and logging.
    /// Absent params map to `null`.
    pub fn to_value(&self) -> Value {
        match self {
            Params::Absent => Value::Null,
            Params::ByName(map) => Value::Object(map.clone()),
            Params::ByPosition(list) => Value::Array(list.clone()),
        }
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Params::Absent => serializer.serialize_none(),
            Params::ByName(map) => map.serialize(serializer),
            Params::ByPosition(list) => list.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Params {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Params::Absent),
            Value::Object(map) => Ok(Params::ByName(map)),
            Value::Array(list) => Ok(Params::ByPosition(list)),
            other => Err(serde::de::Error::custom(format!(
                "params must be an object or an array, got: {other}"
            ))),
        }
    }
}

/// A single JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Params::is_absent")]
    pub params: Params,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            id: Value::Null,
            jsonrpc: default_jsonrpc(),
            method: method.into(),
            params: Params::Absent,
        }
    }

    pub fn with_params(method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            params: Params::ByName(params),
            ..Self::new(method)
        }
    }

    /// Parse a request from raw body bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A single JSON-RPC response, either ours or relayed from an SDK server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl RpcResponse {
    /// Serialize for the HTTP response body. Indented output, matching what
    /// SDK servers themselves emit.
    pub fn to_body(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).unwrap_or_else(|e| {
            // A Value tree always serializes; reaching this means a bug.
            format!(r#"{{"jsonrpc":"2.0","error":{{"code":-32080,"message":"{e}"}}}}"#).into_bytes()
        })
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound JSON-RPC client for SDK servers.
//!
//! A thin wrapper over a shared `reqwest::Client`. The HTTP client (with
//! its connection pool and the configured request/connect timeouts) is
//! built once at startup and cloned into per-request callers; only the
//! target endpoint varies.

use crate::rpc::{RpcRequest, RpcResponse};

#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// JSON-RPC client bound to a single SDK endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RpcClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one request and decode the response envelope.
    ///
    /// An `Err` here is a transport-layer failure (connect, timeout,
    /// malformed body); RPC-level errors come back inside the response.
    pub async fn call(&self, request: &RpcRequest) -> Result<RpcResponse, RpcClientError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?
            .json::<RpcResponse>()
            .await?;
        Ok(response)
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The proxy endpoint.
//!
//! Accepts client JSON-RPC over POST and dispatches it through a
//! per-request [`Caller`]. Once the body parses as JSON territory, every
//! failure is an RPC error envelope over HTTP 200; only transport-level
//! problems (wrong content type, empty body) get plain 4xx responses.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use serde_json::Value;
use tracing::debug;

use crate::auth::AuthResult;
use crate::query::caller::Caller;
use crate::query::methods;
use crate::rpc::error::ProxyError;
use crate::rpc::{RpcRequest, RpcResponse};
use crate::state::AppState;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Forward one client JSON-RPC request.
pub async fn handle(
    State(state): State<AppState>,
    auth: Option<Extension<AuthResult>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type_ok = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if !content_type_ok {
        return (StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected application/json")
            .into_response();
    }
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty request body").into_response();
    }

    let request = match RpcRequest::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "malformed JSON from client");
            return rpc_response(
                ProxyError::JsonParse(format!("client json parse error: {e}"))
                    .into_response(Value::Null),
            );
        }
    };

    let auth = auth.map(|Extension(a)| a).unwrap_or(AuthResult::NotAttempted);

    let (user_id, sdk_address) = if methods::needs_auth(&request.method) {
        match auth {
            AuthResult::NotAttempted => {
                return rpc_response(ProxyError::AuthRequired.into_response(request.id));
            }
            AuthResult::Failed(message) => {
                return rpc_response(ProxyError::Forbidden(message).into_response(request.id));
            }
            AuthResult::Authenticated {
                user_id,
                sdk_address,
            } => (user_id, sdk_address),
        }
    } else {
        match state.router.random_server() {
            Ok(server) => (0, server.address.clone()),
            Err(e) => {
                return rpc_response(
                    ProxyError::Internal(e.to_string()).into_response(request.id),
                );
            }
        }
    };

    let caller = Caller::new(
        state.sdk_http.clone(),
        sdk_address,
        user_id,
        Some(state.cache.clone()),
        state.metrics.clone(),
        state.config.base_content_url.clone(),
    );
    rpc_response(caller.call(request).await)
}

/// Headers browsers may send to the proxy, the auth token included.
const ALLOW_HEADERS: &str = "X-Lbry-Auth-Token, Origin, X-Requested-With, Content-Type, Accept";

/// CORS pre-flight for the proxy endpoint.
pub async fn preflight() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_MAX_AGE, "7200"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
        ],
    )
        .into_response()
}

fn rpc_response(response: RpcResponse) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)],
        response.to_body(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TOKEN_HEADER;

    #[test]
    fn allow_headers_whitelist_the_token_header() {
        assert!(ALLOW_HEADERS.contains(TOKEN_HEADER));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Applied to the proxy route. Extracts the token header, resolves it, and
//! binds an [`AuthResult`] to the request extensions. The middleware never
//! rejects a request itself — relaxed methods are served without auth, so
//! the per-method decision belongs to the proxy handler.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::{AuthResult, TOKEN_HEADER};
use crate::state::AppState;

/// Resolve the auth token (if any) and bind the outcome to the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth = match request.headers().get(TOKEN_HEADER) {
        None => AuthResult::NotAttempted,
        Some(value) => match value.to_str() {
            Err(_) => AuthResult::Failed("invalid auth token header".into()),
            Ok(token) => {
                let remote_ip = client_ip(&request);
                match state.resolver.resolve(token, remote_ip.as_deref()).await {
                    Ok((user, server)) => AuthResult::Authenticated {
                        user_id: user.id,
                        sdk_address: server.address.clone(),
                    },
                    Err(e) => AuthResult::Failed(e.to_string()),
                }
            }
        },
    };

    request.extensions_mut().insert(auth);
    next.run(request).await
}

/// Best-effort end-user address for the identity service, from the
/// forwarding proxy's header.
fn client_ip(request: &Request) -> Option<String> {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

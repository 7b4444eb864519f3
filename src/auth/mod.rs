// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Clients carry an opaque identity-service token in the
//! `X-Lbry-Auth-Token` header. The middleware resolves it into a local
//! user (creating the row and bootstrapping the wallet on first login) and
//! binds the outcome to the request; the proxy handler decides per method
//! whether the outcome is acceptable.
//!
//! ## Auth flow
//!
//! 1. Client sends `X-Lbry-Auth-Token: <token>`
//! 2. Middleware asks the identity service for the token's user
//! 3. The user must have a verified email
//! 4. The local row is fetched or created (idempotent under races)
//! 5. First login: the router binds an SDK server and the wallet is
//!    initialized there

pub mod middleware;
pub mod remote;
pub mod resolver;

pub use remote::{IdentityClient, RemoteUser};
pub use resolver::{AuthError, AuthResolver};

/// HTTP header carrying the identity-service auth token.
pub const TOKEN_HEADER: &str = "X-Lbry-Auth-Token";

/// Authentication outcome bound to the request by the middleware.
#[derive(Debug, Clone)]
pub enum AuthResult {
    /// No token header was supplied.
    NotAttempted,
    /// A token was supplied but rejected; the message is client-visible.
    Failed(String),
    /// The token resolved to a local user bound to an SDK server.
    Authenticated { user_id: i64, sdk_address: String },
}

impl AuthResult {
    pub fn is_attempted(&self) -> bool {
        !matches!(self, AuthResult::NotAttempted)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthResult::Authenticated { .. })
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token → user resolution.
//!
//! Turns an identity-service token into a local user row bound to an SDK
//! server with a usable wallet. First logins create the row, pick a
//! server, and initialize the wallet; all three steps are idempotent, so
//! concurrent first logins converge on one row, one server, and one
//! wallet.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::auth::remote::IdentityClient;
use crate::metrics::Metrics;
use crate::rpc::client::RpcClient;
use crate::sdkrouter::{SdkRouter, SdkServer};
use crate::storage::{UserDatabase, UserRecord};
use crate::wallet;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("cannot authenticate user with identity service: {0}")]
    RemoteFailed(String),

    #[error("must authenticate")]
    EmailNotVerified,

    #[error("internal error during authentication: {0}")]
    Internal(String),
}

pub struct AuthResolver {
    identity: IdentityClient,
    db: Arc<UserDatabase>,
    router: Arc<SdkRouter>,
    /// Shared SDK-side HTTP client, used for first-login wallet setup.
    sdk_http: reqwest::Client,
    metrics: Arc<Metrics>,
}

impl AuthResolver {
    pub fn new(
        identity: IdentityClient,
        db: Arc<UserDatabase>,
        router: Arc<SdkRouter>,
        sdk_http: reqwest::Client,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            identity,
            db,
            router,
            sdk_http,
            metrics,
        }
    }

    /// Resolve a token to the local user and the SDK server owning their
    /// wallet.
    pub async fn resolve(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> Result<(UserRecord, Arc<SdkServer>), AuthError> {
        let started = Instant::now();
        let result = self.resolve_inner(token, remote_ip).await;
        let duration = started.elapsed().as_secs_f64();
        match &result {
            Ok(_) => self.metrics.auth_success_duration.observe(duration),
            Err(_) => self.metrics.auth_failed_duration.observe(duration),
        }
        result
    }

    async fn resolve_inner(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> Result<(UserRecord, Arc<SdkServer>), AuthError> {
        let remote = self.identity.user_me(token, remote_ip).await.map_err(|e| {
            debug!(error = %e, "could not authenticate with identity service");
            AuthError::RemoteFailed(e.to_string())
        })?;

        if !remote.has_verified_email {
            debug!(user_id = remote.id, "identity service user has no verified email");
            return Err(AuthError::EmailNotVerified);
        }

        let email = remote.primary_email.as_deref().unwrap_or_default();
        let user = self
            .db
            .get_or_create_user(remote.id, email)
            .map_err(internal)?;

        let first_binding = user.sdk_server_id.is_none();
        let server = self
            .router
            .get_server_for_user(user.id)
            .map_err(internal)?;

        if first_binding {
            // Another login may have already initialized the wallet; the
            // initialize ladder treats every such outcome as success.
            let client = RpcClient::new(self.sdk_http.clone(), server.address.clone());
            wallet::initialize(&client, user.id).await.map_err(|e| {
                warn!(user_id = user.id, server = %server.id, error = %e, "wallet setup failed");
                internal(e)
            })?;
            let user = self.db.touch_last_load(user.id).map_err(internal)?;
            info!(user_id = user.id, server = %server.id, "first login completed");
            return Ok((user, server));
        }

        Ok((user, server))
    }
}

fn internal(e: impl std::fmt::Display) -> AuthError {
    AuthError::Internal(e.to_string())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity-service client.
//!
//! The identity service owns user accounts; the gateway only asks it one
//! question: which user does this token belong to, and is their email
//! verified.

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity service rejected token: {0}")]
    Rejected(String),
}

/// User data as the identity service reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    pub id: i64,
    #[serde(default)]
    pub has_verified_email: bool,
    #[serde(default)]
    pub primary_email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserMeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<RemoteUser>,
}

/// Client for the identity service's `user/me` endpoint.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    host: String,
}

impl IdentityClient {
    /// `host` is the service base URL; `http` carries the (shorter)
    /// identity-service timeout.
    pub fn new(http: reqwest::Client, host: impl Into<String>) -> Self {
        let mut host = host.into();
        while host.ends_with('/') {
            host.pop();
        }
        Self { http, host }
    }

    /// Resolve a token to its remote user. `remote_ip` is forwarded so the
    /// identity service sees the end-user address, not the gateway's.
    pub async fn user_me(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> Result<RemoteUser, IdentityError> {
        let mut form = vec![("auth_token", token)];
        if let Some(ip) = remote_ip {
            form.push(("remote_ip", ip));
        }

        let response: UserMeResponse = self
            .http
            .post(format!("{}/user/me", self.host))
            .form(&form)
            .send()
            .await?
            .json()
            .await?;

        if !response.success {
            return Err(IdentityError::Rejected(
                response.error.unwrap_or_else(|| "unknown error".into()),
            ));
        }
        response
            .data
            .ok_or_else(|| IdentityError::Rejected("response carried no user".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_normalized() {
        let client = IdentityClient::new(reqwest::Client::new(), "https://api.example.com///");
        assert_eq!(client.host, "https://api.example.com");
    }
}

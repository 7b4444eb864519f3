// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Application State
//!
//! Shared state passed to all Axum request handlers via the `State`
//! extractor. Every component gets its handles through constructors here;
//! there are no process-wide singletons.
//!
//! `AppState` is `Clone` and `Send + Sync`: the heavyweight members are
//! behind `Arc`, and the two `reqwest` clients share their connection
//! pools across clones.

use std::sync::Arc;

use crate::auth::{AuthResolver, IdentityClient};
use crate::config::Config;
use crate::metrics::Metrics;
use crate::query::cache::QueryCache;
use crate::sdkrouter::{SdkRouter, SdkServer};
use crate::storage::{StoreError, UserDatabase};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("could not open users database: {0}")]
    Store(#[from] StoreError),

    #[error("could not register metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("could not build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub router: Arc<SdkRouter>,
    pub users: Arc<UserDatabase>,
    pub cache: Arc<QueryCache>,
    pub resolver: Arc<AuthResolver>,
    pub metrics: Arc<Metrics>,
    /// SDK-side HTTP client carrying the long RPC timeouts. Cloned into
    /// per-request callers.
    pub sdk_http: reqwest::Client,
}

impl AppState {
    /// Wire up every component from a config snapshot.
    pub fn build(config: Config) -> Result<Self, StartupError> {
        let sdk_http = reqwest::Client::builder()
            .timeout(config.rpc_timeout)
            .connect_timeout(config.rpc_connect_timeout)
            .build()?;
        let identity_http = reqwest::Client::builder()
            .timeout(config.identity_timeout)
            .build()?;

        let users = Arc::new(UserDatabase::open(&config.data_dir.join("users.redb"))?);
        let metrics = Arc::new(Metrics::new()?);

        let servers = config
            .sdk_servers
            .iter()
            .map(|s| SdkServer::new(s.id.clone(), s.address.clone(), s.weight))
            .collect();
        let router = Arc::new(SdkRouter::new(servers, users.clone(), sdk_http.clone()));

        let resolver = Arc::new(AuthResolver::new(
            IdentityClient::new(identity_http, config.internal_api_host.clone()),
            users.clone(),
            router.clone(),
            sdk_http.clone(),
            metrics.clone(),
        ));
        let cache = Arc::new(QueryCache::new(config.cache_size, config.cache_ttl));

        Ok(Self {
            config: Arc::new(config),
            router,
            users,
            cache,
            resolver,
            metrics,
            sdk_http,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogFormat, SdkServerConfig};
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            address: "127.0.0.1:0".into(),
            data_dir: dir.path().to_path_buf(),
            internal_api_host: "http://127.0.0.1:1".into(),
            base_content_url: "http://localhost:8080/content/".into(),
            sdk_servers: vec![SdkServerConfig {
                id: "sdk-a".into(),
                address: "http://127.0.0.1:1/".into(),
                weight: 1,
            }],
            cache_size: 16,
            cache_ttl: Duration::from_secs(60),
            rpc_timeout: Duration::from_secs(300),
            rpc_connect_timeout: Duration::from_secs(120),
            identity_timeout: Duration::from_secs(20),
            load_watch_interval: Duration::from_secs(120),
            log_format: LogFormat::Pretty,
        }
    }

    #[test]
    fn state_builds_and_clones() {
        let dir = TempDir::new().unwrap();
        let state = AppState::build(test_config(&dir)).unwrap();
        let cloned = state.clone();
        assert_eq!(cloned.router.servers().len(), 1);
        assert_eq!(cloned.config.cache_size, 16);
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sticky, load-aware assignment of users to SDK servers.
//!
//! Every authenticated user is bound to exactly one SDK server, because
//! that server holds the user's wallet file. The binding is persisted on
//! the user row and never changes once set. New users land on the healthy
//! server with the lowest wallet count per weight unit; unauthenticated
//! relaxed calls go to a random healthy server.
//!
//! A background watcher refreshes per-server wallet counts and health.
//! Rebalancing only influences new assignments — existing users are never
//! migrated.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics::Metrics;
use crate::query::methods::METHOD_WALLET_LIST;
use crate::rpc::client::RpcClient;
use crate::rpc::RpcRequest;
use crate::storage::{StoreError, UserDatabase};

/// Default interval between load-watching sweeps.
pub const DEFAULT_LOAD_WATCH_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("no healthy sdk servers available")]
    NoServers,

    #[error("user {user_id} is bound to unknown sdk server {server_id}")]
    UnknownServer { user_id: i64, server_id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One configured SDK server. Declared at startup, never removed at
/// runtime; health and wallet count are advisory state owned by the
/// watcher.
#[derive(Debug)]
pub struct SdkServer {
    pub id: String,
    pub address: String,
    pub weight: u32,
    healthy: AtomicBool,
    wallet_count: AtomicI64,
}

impl SdkServer {
    pub fn new(id: impl Into<String>, address: impl Into<String>, weight: u32) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            weight: weight.max(1),
            healthy: AtomicBool::new(true),
            wallet_count: AtomicI64::new(0),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn wallet_count(&self) -> i64 {
        self.wallet_count.load(Ordering::Relaxed)
    }

    fn set_probe_result(&self, healthy: bool, wallet_count: Option<i64>) {
        self.healthy.store(healthy, Ordering::Relaxed);
        if let Some(count) = wallet_count {
            self.wallet_count.store(count, Ordering::Relaxed);
        }
    }

    /// Wallets per weight unit; the assignment score.
    fn load(&self) -> f64 {
        self.wallet_count() as f64 / f64::from(self.weight)
    }
}

pub struct SdkRouter {
    servers: Vec<Arc<SdkServer>>,
    db: Arc<UserDatabase>,
    http: reqwest::Client,
}

impl SdkRouter {
    pub fn new(servers: Vec<SdkServer>, db: Arc<UserDatabase>, http: reqwest::Client) -> Self {
        Self {
            servers: servers.into_iter().map(Arc::new).collect(),
            db,
            http,
        }
    }

    pub fn servers(&self) -> &[Arc<SdkServer>] {
        &self.servers
    }

    pub fn server_by_id(&self, id: &str) -> Option<Arc<SdkServer>> {
        self.servers.iter().find(|s| s.id == id).cloned()
    }

    /// Resolve the server owning a user's wallet. Idempotent and
    /// deterministic once a binding exists.
    pub fn get_server_for_user(&self, user_id: i64) -> Result<Arc<SdkServer>, RouterError> {
        if let Some(user) = self.db.get_user(user_id)? {
            if let Some(server_id) = user.sdk_server_id {
                return self
                    .server_by_id(&server_id)
                    .ok_or(RouterError::UnknownServer { user_id, server_id });
            }
        }
        self.assign_server(user_id)
    }

    /// Bind a user to the least-loaded healthy server. Persisted
    /// atomically; under a race the first writer wins and both callers end
    /// up acting on the same server.
    pub fn assign_server(&self, user_id: i64) -> Result<Arc<SdkServer>, RouterError> {
        let pick = self.least_loaded()?;
        let record = self.db.assign_sdk_server(user_id, &pick.id)?;
        // The stored binding is authoritative: a concurrent assignment may
        // have won with a different pick.
        let server_id = record.sdk_server_id.expect("assignment just persisted");
        let server = self
            .server_by_id(&server_id)
            .ok_or(RouterError::UnknownServer { user_id, server_id })?;
        info!(user_id, server = %server.id, "user bound to sdk server");
        Ok(server)
    }

    /// A random healthy server, for unauthenticated relaxed calls.
    pub fn random_server(&self) -> Result<Arc<SdkServer>, RouterError> {
        let healthy: Vec<_> = self.servers.iter().filter(|s| s.is_healthy()).collect();
        if healthy.is_empty() {
            return Err(RouterError::NoServers);
        }
        let index = rand::thread_rng().gen_range(0..healthy.len());
        Ok(Arc::clone(healthy[index]))
    }

    fn least_loaded(&self) -> Result<Arc<SdkServer>, RouterError> {
        self.servers
            .iter()
            .filter(|s| s.is_healthy())
            .min_by(|a, b| {
                a.load()
                    .partial_cmp(&b.load())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned()
            .ok_or(RouterError::NoServers)
    }

    /// Run load-watching sweeps until the cancellation token triggers.
    ///
    /// Spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(router.clone().watch_load(interval, metrics, shutdown.clone()));
    /// ```
    pub async fn watch_load(
        self: Arc<Self>,
        interval: Duration,
        metrics: Arc<Metrics>,
        shutdown: CancellationToken,
    ) {
        info!(interval_secs = interval.as_secs(), "sdk load watcher starting");
        loop {
            if shutdown.is_cancelled() {
                info!("sdk load watcher shutting down");
                return;
            }

            self.probe_all(&metrics).await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = shutdown.cancelled() => {
                    info!("sdk load watcher shutting down");
                    return;
                }
            }
        }
    }

    /// One sweep: ask every server for its wallet count, refresh health.
    pub async fn probe_all(&self, metrics: &Metrics) {
        for server in &self.servers {
            match self.probe(server).await {
                Ok(count) => {
                    server.set_probe_result(true, Some(count));
                    metrics
                        .wallets_loaded
                        .with_label_values(&[server.address.as_str()])
                        .set(count);
                    debug!(server = %server.id, wallets = count, "sdk probe ok");
                }
                Err(reason) => {
                    server.set_probe_result(false, None);
                    warn!(server = %server.id, %reason, "sdk probe failed, marking unhealthy");
                }
            }
        }
    }

    async fn probe(&self, server: &SdkServer) -> Result<i64, String> {
        let client = RpcClient::new(self.http.clone(), server.address.clone());
        let mut params = serde_json::Map::new();
        params.insert("page".into(), json!(1));
        params.insert("page_size".into(), json!(1));
        let request = RpcRequest::with_params(METHOD_WALLET_LIST, params);

        let response = client.call(&request).await.map_err(|e| e.to_string())?;
        if let Some(err) = response.error {
            return Err(err.message);
        }
        response
            .result
            .as_ref()
            .and_then(|r| r.get("total_items"))
            .and_then(|v| v.as_i64())
            .ok_or_else(|| "wallet_list response had no total_items".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn router_with(servers: Vec<SdkServer>) -> (Arc<SdkRouter>, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(UserDatabase::open(&dir.path().join("users.redb")).unwrap());
        db.get_or_create_user(1, "").unwrap();
        db.get_or_create_user(2, "").unwrap();
        (
            Arc::new(SdkRouter::new(servers, db, reqwest::Client::new())),
            dir,
        )
    }

    fn server(id: &str, weight: u32, wallets: i64) -> SdkServer {
        let s = SdkServer::new(id, format!("http://{id}:5279"), weight);
        s.wallet_count.store(wallets, Ordering::Relaxed);
        s
    }

    #[test]
    fn new_users_land_on_the_least_loaded_server() {
        let (router, _dir) =
            router_with(vec![server("sdk-a", 1, 100), server("sdk-b", 1, 10)]);
        let picked = router.get_server_for_user(1).unwrap();
        assert_eq!(picked.id, "sdk-b");
    }

    #[test]
    fn weight_scales_the_load_score() {
        // 100 wallets at weight 10 beats 20 wallets at weight 1.
        let (router, _dir) =
            router_with(vec![server("sdk-a", 10, 100), server("sdk-b", 1, 20)]);
        assert_eq!(router.get_server_for_user(1).unwrap().id, "sdk-a");
    }

    #[test]
    fn ties_break_on_lexical_server_id() {
        let (router, _dir) = router_with(vec![
            server("sdk-c", 1, 5),
            server("sdk-a", 1, 5),
            server("sdk-b", 1, 5),
        ]);
        assert_eq!(router.get_server_for_user(1).unwrap().id, "sdk-a");
    }

    #[test]
    fn assignment_is_sticky_across_load_changes() {
        let (router, _dir) =
            router_with(vec![server("sdk-a", 1, 0), server("sdk-b", 1, 50)]);
        let first = router.get_server_for_user(1).unwrap();
        assert_eq!(first.id, "sdk-a");

        // The load flips; the binding must not.
        first.wallet_count.store(500, Ordering::Relaxed);
        assert_eq!(router.get_server_for_user(1).unwrap().id, "sdk-a");
        // A new user sees the new load picture.
        assert_eq!(router.get_server_for_user(2).unwrap().id, "sdk-b");
    }

    #[test]
    fn unhealthy_servers_are_skipped_for_new_assignments() {
        let (router, _dir) =
            router_with(vec![server("sdk-a", 1, 0), server("sdk-b", 1, 50)]);
        router.servers()[0].set_probe_result(false, None);
        assert_eq!(router.get_server_for_user(1).unwrap().id, "sdk-b");
    }

    #[test]
    fn bound_users_keep_their_server_even_when_unhealthy() {
        let (router, _dir) =
            router_with(vec![server("sdk-a", 1, 0), server("sdk-b", 1, 50)]);
        assert_eq!(router.get_server_for_user(1).unwrap().id, "sdk-a");

        router.servers()[0].set_probe_result(false, None);
        // Sticky binding still resolves; failures surface downstream.
        assert_eq!(router.get_server_for_user(1).unwrap().id, "sdk-a");
    }

    #[test]
    fn random_server_only_returns_healthy_ones() {
        let (router, _dir) =
            router_with(vec![server("sdk-a", 1, 0), server("sdk-b", 1, 0)]);
        router.servers()[0].set_probe_result(false, None);
        for _ in 0..20 {
            assert_eq!(router.random_server().unwrap().id, "sdk-b");
        }
    }

    #[test]
    fn no_healthy_servers_is_an_error() {
        let (router, _dir) = router_with(vec![server("sdk-a", 1, 0)]);
        router.servers()[0].set_probe_result(false, None);
        assert!(matches!(router.random_server(), Err(RouterError::NoServers)));
        assert!(matches!(
            router.get_server_for_user(1),
            Err(RouterError::NoServers)
        ));
    }

    #[test]
    fn unknown_persisted_binding_is_surfaced_not_reassigned() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(UserDatabase::open(&dir.path().join("users.redb")).unwrap());
        db.get_or_create_user(1, "").unwrap();
        db.assign_sdk_server(1, "sdk-gone").unwrap();

        let router = SdkRouter::new(vec![server("sdk-a", 1, 0)], db, reqwest::Client::new());
        assert!(matches!(
            router.get_server_for_user(1),
            Err(RouterError::UnknownServer { .. })
        ));
    }
}

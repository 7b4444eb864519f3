// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-user wallet lifecycle on a single SDK server.
//!
//! Wallet identity is a pure function of the user id and is never stored.
//! The SDK only reports wallet state through error message text, so state
//! detection is an ordered substring table; unclassified messages are
//! logged so new SDK versions surface quickly.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::query::methods::{
    METHOD_WALLET_ADD, METHOD_WALLET_CREATE, METHOD_WALLET_REMOVE, PARAM_WALLET_ID,
};
use crate::rpc::client::{RpcClient, RpcClientError};
use crate::rpc::RpcRequest;

/// Deterministic wallet id for a user. Stable across restarts.
pub fn wallet_id(user_id: i64) -> String {
    format!("wallet.{user_id}")
}

/// Wallet states an SDK server reports through error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletErrorKind {
    /// `wallet_create`: the wallet already exists and is loaded.
    AlreadyExists,
    /// `wallet_create`: the wallet file exists on disk but is not loaded.
    NeedsLoading,
    /// `wallet_add`: the wallet is already loaded and operational.
    AlreadyLoaded,
    /// Any wallet-bound call: the wallet is not loaded on this server.
    NotLoaded,
    /// `wallet_add`: the wallet file does not exist.
    NotFound,
}

/// Ordered substring table. Order matters: the `at path` patterns must be
/// probed before the bare `Couldn't find wallet:` prefix.
const CLASSIFICATION: &[(&str, WalletErrorKind)] = &[
    ("already exists", WalletErrorKind::AlreadyExists),
    ("Couldn't find wallet at path", WalletErrorKind::NeedsLoading),
    ("is already loaded", WalletErrorKind::AlreadyLoaded),
    ("Couldn't find wallet:", WalletErrorKind::NotLoaded),
    ("was not found", WalletErrorKind::NotFound),
];

/// Classify an SDK error message into a wallet state.
pub fn classify(message: &str) -> Option<WalletErrorKind> {
    CLASSIFICATION
        .iter()
        .find(|(needle, _)| message.contains(needle))
        .map(|(_, kind)| *kind)
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("{message}")]
    Classified {
        user_id: i64,
        kind: WalletErrorKind,
        message: String,
    },
    #[error("{message}")]
    Sdk { user_id: i64, message: String },
    #[error(transparent)]
    Transport(#[from] RpcClientError),
}

impl WalletError {
    pub fn kind(&self) -> Option<WalletErrorKind> {
        match self {
            WalletError::Classified { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

fn wallet_params(user_id: i64) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert(PARAM_WALLET_ID.into(), json!(wallet_id(user_id)));
    params
}

async fn call_wallet_op(
    client: &RpcClient,
    user_id: i64,
    request: RpcRequest,
) -> Result<(), WalletError> {
    let response = client.call(&request).await?;
    match response.error {
        None => Ok(()),
        Some(err) => match classify(&err.message) {
            Some(kind) => Err(WalletError::Classified {
                user_id,
                kind,
                message: err.message,
            }),
            None => {
                warn!(user_id, message = %err.message, "unclassified wallet error from sdk");
                Err(WalletError::Sdk {
                    user_id,
                    message: err.message,
                })
            }
        },
    }
}

/// Create a new wallet on the SDK server.
///
/// A returned error does not necessarily mean the wallet is unusable:
/// `AlreadyExists` means it is fine to proceed, `NeedsLoading` means
/// [`add`] has to run first.
pub async fn create(client: &RpcClient, user_id: i64) -> Result<(), WalletError> {
    let mut params = wallet_params(user_id);
    params.insert("skip_on_startup".into(), json!(false));
    params.insert("create_account".into(), json!(true));
    params.insert("single_key".into(), json!(true));
    call_wallet_op(
        client,
        user_id,
        RpcRequest::with_params(METHOD_WALLET_CREATE, params),
    )
    .await?;
    info!(user_id, "wallet created");
    Ok(())
}

/// Load an existing wallet from disk. May fail with `AlreadyLoaded`
/// (operational) or `NotFound` (no wallet file on this server).
pub async fn add(client: &RpcClient, user_id: i64) -> Result<(), WalletError> {
    call_wallet_op(
        client,
        user_id,
        RpcRequest::with_params(METHOD_WALLET_ADD, wallet_params(user_id)),
    )
    .await?;
    info!(user_id, "wallet loaded");
    Ok(())
}

/// Unload a wallet from the SDK server. The wallet file stays on disk.
pub async fn remove(client: &RpcClient, user_id: i64) -> Result<(), WalletError> {
    call_wallet_op(
        client,
        user_id,
        RpcRequest::with_params(METHOD_WALLET_REMOVE, wallet_params(user_id)),
    )
    .await?;
    info!(user_id, "wallet unloaded");
    Ok(())
}

/// Create-or-load a wallet so it can be used immediately.
///
/// Recovers from every state a concurrent first login can produce: an
/// existing wallet and an already-loaded wallet both count as success, a
/// wallet file left from a previous run is loaded in place.
pub async fn initialize(client: &RpcClient, user_id: i64) -> Result<(), WalletError> {
    match create(client, user_id).await {
        Ok(()) => Ok(()),
        Err(e) => match e.kind() {
            Some(WalletErrorKind::AlreadyExists) => {
                info!(user_id, "wallet already exists");
                Ok(())
            }
            Some(WalletErrorKind::NeedsLoading) => match add(client, user_id).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == Some(WalletErrorKind::AlreadyLoaded) => {
                    info!(user_id, "wallet already loaded");
                    Ok(())
                }
                Err(e) => Err(e),
            },
            _ => Err(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_id_is_deterministic() {
        assert_eq!(wallet_id(751365), "wallet.751365");
        assert_eq!(wallet_id(751365), wallet_id(751365));
    }

    #[test]
    fn classification_table() {
        assert_eq!(
            classify("Wallet at path /storage/wallet.1 already exists"),
            Some(WalletErrorKind::AlreadyExists)
        );
        assert_eq!(
            classify("Couldn't find wallet at path /storage/wallet.1"),
            Some(WalletErrorKind::NeedsLoading)
        );
        assert_eq!(
            classify("Wallet at path // is already loaded"),
            Some(WalletErrorKind::AlreadyLoaded)
        );
        assert_eq!(
            classify("Couldn't find wallet: //"),
            Some(WalletErrorKind::NotLoaded)
        );
        assert_eq!(
            classify("Wallet at path // was not found"),
            Some(WalletErrorKind::NotFound)
        );
        assert_eq!(classify("some novel sdk error"), None);
    }

    #[test]
    fn not_loaded_wins_over_needs_loading_only_with_path() {
        // The two `Couldn't find wallet` shapes are distinct states.
        assert_eq!(
            classify("Couldn't find wallet: wallet.5"),
            Some(WalletErrorKind::NotLoaded)
        );
        assert_ne!(
            classify("Couldn't find wallet at path x"),
            Some(WalletErrorKind::NotLoaded)
        );
    }

    mod ops {
        use super::*;
        use crate::testing::MockRpcServer;
        use serde_json::json;

        fn client_for(server: &MockRpcServer) -> RpcClient {
            RpcClient::new(reqwest::Client::new(), server.url())
        }

        #[tokio::test]
        async fn create_sends_the_full_wallet_options() {
            let server = MockRpcServer::start().await;
            let client = client_for(&server);
            server.queue(json!({"jsonrpc": "2.0", "result": {}}));

            create(&client, 42).await.unwrap();

            let outbound = &server.received()[0];
            assert_eq!(outbound["method"], json!("wallet_create"));
            assert_eq!(
                outbound["params"],
                json!({
                    "create_account": true,
                    "single_key": true,
                    "skip_on_startup": false,
                    "wallet_id": "wallet.42",
                })
            );
        }

        #[tokio::test]
        async fn remove_unloads_by_wallet_id() {
            let server = MockRpcServer::start().await;
            let client = client_for(&server);
            server.queue(json!({"jsonrpc": "2.0", "result": {}}));

            remove(&client, 42).await.unwrap();

            let outbound = &server.received()[0];
            assert_eq!(outbound["method"], json!("wallet_remove"));
            assert_eq!(outbound["params"], json!({"wallet_id": "wallet.42"}));
        }

        #[tokio::test]
        async fn initialize_recovers_from_every_benign_state() {
            let server = MockRpcServer::start().await;
            let client = client_for(&server);

            // Fresh wallet.
            server.queue(json!({"jsonrpc": "2.0", "result": {}}));
            initialize(&client, 1).await.unwrap();

            // Wallet already there and loaded.
            server.queue(json!({
                "jsonrpc": "2.0",
                "error": {"message": "Wallet at path /storage/wallet.1 already exists"}
            }));
            initialize(&client, 1).await.unwrap();

            // On-disk wallet that loads in place.
            server.queue(json!({
                "jsonrpc": "2.0",
                "error": {"message": "Couldn't find wallet at path /storage/wallet.1"}
            }));
            server.queue(json!({
                "jsonrpc": "2.0",
                "error": {"message": "Wallet at path /storage/wallet.1 is already loaded"}
            }));
            initialize(&client, 1).await.unwrap();
        }

        #[tokio::test]
        async fn initialize_propagates_unknown_sdk_errors() {
            let server = MockRpcServer::start().await;
            let client = client_for(&server);
            server.queue(json!({
                "jsonrpc": "2.0",
                "error": {"message": "disk quota exceeded"}
            }));

            let err = initialize(&client, 1).await.unwrap_err();
            assert!(matches!(err, WalletError::Sdk { .. }));
            assert_eq!(err.to_string(), "disk quota exceeded");
        }

        #[tokio::test]
        async fn add_surfaces_missing_wallet_files() {
            let server = MockRpcServer::start().await;
            let client = client_for(&server);
            server.queue(json!({
                "jsonrpc": "2.0",
                "error": {"message": "Wallet at path /storage/wallet.1 was not found"}
            }));

            let err = add(&client, 1).await.unwrap_err();
            assert_eq!(err.kind(), Some(WalletErrorKind::NotFound));
        }
    }
}

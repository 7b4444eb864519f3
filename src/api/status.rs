// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Gateway status with a snapshot of the SDK pool.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// `ok` while at least one SDK server is healthy, `degraded` otherwise.
    pub status: String,
    pub version: String,
    pub sdk_servers: Vec<SdkServerStatus>,
}

/// One SDK server as the load watcher last saw it.
#[derive(Debug, Serialize, ToSchema)]
pub struct SdkServerStatus {
    pub id: String,
    pub address: String,
    pub healthy: bool,
    /// Advisory wallet count from the last probe.
    pub wallets: i64,
}

/// Gateway health endpoint handler.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Status",
    responses(
        (status = 200, description = "Gateway status and SDK pool snapshot", body = StatusResponse)
    )
)]
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let sdk_servers: Vec<SdkServerStatus> = state
        .router
        .servers()
        .iter()
        .map(|s| SdkServerStatus {
            id: s.id.clone(),
            address: s.address.clone(),
            healthy: s.is_healthy(),
            wallets: s.wallet_count(),
        })
        .collect();

    let any_healthy = sdk_servers.iter().any(|s| s.healthy);
    Json(StatusResponse {
        status: if any_healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sdk_servers,
    })
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! walletgate - Authenticating JSON-RPC Wallet Gateway
//!
//! Multiplexes end-user clients onto a pool of wallet SDK daemons. Each
//! user is bound to a per-user wallet hosted on exactly one SDK server;
//! the gateway authenticates users against an external identity service,
//! routes to the owning SDK, injects wallet identity into every call,
//! enforces a method allow/deny list, transparently recovers from
//! unloaded wallets, and caches selected idempotent responses.
//!
//! ## Modules
//!
//! - `api` - HTTP surface (Axum): proxy endpoint, status, metrics
//! - `auth` - Token resolution against the identity service
//! - `query` - Query validation, caching, and the Caller pipeline
//! - `sdkrouter` - Sticky load-aware user → SDK assignment
//! - `wallet` - Per-user wallet lifecycle on SDK servers
//! - `storage` - Embedded users table (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod metrics;
pub mod query;
pub mod rpc;
pub mod sdkrouter;
pub mod state;
pub mod storage;
pub mod wallet;

#[cfg(test)]
pub mod testing;

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Prometheus metrics for the proxy pipeline.
//!
//! All metrics hang off an explicit `Registry` owned by the process state;
//! nothing is registered globally. Exposition is plain text on
//! `/internal/metrics`.

use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntGaugeVec, Opts, Registry, TextEncoder,
};

pub const FAILURE_KIND_NET: &str = "net";
pub const FAILURE_KIND_RPC: &str = "rpc";
pub const FAILURE_KIND_AUTH: &str = "auth";
pub const FAILURE_KIND_CLIENT_JSON: &str = "client_json";
pub const FAILURE_KIND_INTERNAL: &str = "internal";

const CALL_SECONDS_BUCKETS: &[f64] = &[
    0.005, 0.025, 0.05, 0.1, 0.25, 0.4, 1.0, 2.0, 5.0, 10.0, 20.0, 60.0, 120.0, 300.0,
];

pub struct Metrics {
    registry: Registry,

    /// Method call latency distributions, per (method, endpoint).
    pub call_durations: HistogramVec,
    /// Failed method call latency distributions, per (method, endpoint, kind).
    pub call_failed_durations: HistogramVec,
    /// Time to successful authentication against the identity service.
    pub auth_success_duration: Histogram,
    /// Time to failed authentication response.
    pub auth_failed_duration: Histogram,
    /// Number of wallets currently loaded, per SDK endpoint.
    pub wallets_loaded: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let call_durations = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new("proxy_calls_total_seconds", "Method call latency distributions")
                    .buckets(CALL_SECONDS_BUCKETS.to_vec()),
                &["method", "endpoint"],
            )?,
        )?;
        let call_failed_durations = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "proxy_calls_failed_seconds",
                    "Failed method call latency distributions",
                )
                .buckets(CALL_SECONDS_BUCKETS.to_vec()),
                &["method", "endpoint", "kind"],
            )?,
        )?;
        let auth_success_duration = register(
            &registry,
            Histogram::with_opts(HistogramOpts::new(
                "identity_auth_success_seconds",
                "Time to successful authentication",
            ))?,
        )?;
        let auth_failed_duration = register(
            &registry,
            Histogram::with_opts(HistogramOpts::new(
                "identity_auth_failed_seconds",
                "Time to failed authentication response",
            ))?,
        )?;
        let wallets_loaded = register(
            &registry,
            IntGaugeVec::new(
                Opts::new("sdk_wallets_count", "Number of wallets currently loaded"),
                &["endpoint"],
            )?,
        )?;

        Ok(Self {
            registry,
            call_durations,
            call_failed_durations,
            auth_success_duration,
            auth_failed_duration,
            wallets_loaded,
        })
    }

    /// Text exposition of every registered metric family.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .unwrap_or_default()
    }
}

fn register<T: Clone + prometheus::core::Collector + 'static>(
    registry: &Registry,
    metric: T,
) -> Result<T, prometheus::Error> {
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

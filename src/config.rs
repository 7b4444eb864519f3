// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup into an
//! immutable [`Config`] snapshot that is threaded through component
//! constructors. No process-wide settings object exists.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ADDRESS` | Server bind address | `0.0.0.0:8080` |
//! | `DATA_DIR` | Directory for the embedded users database | `./data` |
//! | `INTERNAL_API_HOST` | Identity service base URL | `https://api.lbry.com` |
//! | `BASE_CONTENT_URL` | Prefix for materialized streaming URLs | `http://localhost:8080/content/` |
//! | `SDK_SERVERS` | Comma-separated `id=url` pairs, optional `@weight` | `default=http://localhost:5279/` |
//! | `CACHE_SIZE` | Max cached query results | `1024` |
//! | `CACHE_TTL_SECONDS` | Cache entry lifetime | `300` |
//! | `RPC_TIMEOUT_SECONDS` | SDK response timeout | `300` |
//! | `RPC_CONNECT_TIMEOUT_SECONDS` | SDK dial timeout | `120` |
//! | `IDENTITY_TIMEOUT_SECONDS` | Identity service timeout | `20` |
//! | `LOAD_WATCH_INTERVAL_SECONDS` | SDK load watcher interval | `120` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Log output format, selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// One SDK server declaration from `SDK_SERVERS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkServerConfig {
    pub id: String,
    pub address: String,
    pub weight: u32,
}

/// Immutable configuration snapshot.
#[derive(Debug, Clone)]
pub struct Config {
    pub address: String,
    pub data_dir: PathBuf,
    pub internal_api_host: String,
    pub base_content_url: String,
    pub sdk_servers: Vec<SdkServerConfig>,
    pub cache_size: usize,
    pub cache_ttl: Duration,
    pub rpc_timeout: Duration,
    pub rpc_connect_timeout: Duration,
    pub identity_timeout: Duration,
    pub load_watch_interval: Duration,
    pub log_format: LogFormat,
}

impl Config {
    /// Build a snapshot from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            address: env_or_default("ADDRESS", "0.0.0.0:8080"),
            data_dir: PathBuf::from(env_or_default("DATA_DIR", "./data")),
            internal_api_host: env_or_default("INTERNAL_API_HOST", "https://api.lbry.com"),
            base_content_url: env_or_default(
                "BASE_CONTENT_URL",
                "http://localhost:8080/content/",
            ),
            sdk_servers: parse_sdk_servers(&env_or_default(
                "SDK_SERVERS",
                "default=http://localhost:5279/",
            ))?,
            cache_size: env_parsed("CACHE_SIZE", 1024)?,
            cache_ttl: Duration::from_secs(env_parsed("CACHE_TTL_SECONDS", 300)?),
            rpc_timeout: Duration::from_secs(env_parsed("RPC_TIMEOUT_SECONDS", 300)?),
            rpc_connect_timeout: Duration::from_secs(env_parsed(
                "RPC_CONNECT_TIMEOUT_SECONDS",
                120,
            )?),
            identity_timeout: Duration::from_secs(env_parsed("IDENTITY_TIMEOUT_SECONDS", 20)?),
            load_watch_interval: Duration::from_secs(env_parsed(
                "LOAD_WATCH_INTERVAL_SECONDS",
                120,
            )?),
            log_format: match env_or_default("LOG_FORMAT", "pretty").as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }
}

/// Parse `SDK_SERVERS`: comma-separated `id=url` pairs with an optional
/// `@weight` suffix, e.g. `main=http://a:5279@2,spare=http://b:5279`.
pub fn parse_sdk_servers(raw: &str) -> Result<Vec<SdkServerConfig>, ConfigError> {
    let mut servers = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, rest) = entry.split_once('=').ok_or_else(|| ConfigError::Invalid {
            name: "SDK_SERVERS",
            reason: format!("expected id=url, got: {entry}"),
        })?;
        let (address, weight) = match rest.rsplit_once('@') {
            Some((address, weight)) => {
                let weight = weight.parse().map_err(|_| ConfigError::Invalid {
                    name: "SDK_SERVERS",
                    reason: format!("bad weight in: {entry}"),
                })?;
                (address, weight)
            }
            None => (rest, 1),
        };
        servers.push(SdkServerConfig {
            id: id.trim().to_string(),
            address: address.trim().to_string(),
            weight,
        });
    }
    if servers.is_empty() {
        return Err(ConfigError::Invalid {
            name: "SDK_SERVERS",
            reason: "at least one sdk server is required".into(),
        });
    }
    Ok(servers)
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("could not parse: {raw}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sdk_servers_parse_with_and_without_weight() {
        let servers = parse_sdk_servers("main=http://a:5279@2, spare=http://b:5279").unwrap();
        assert_eq!(
            servers,
            vec![
                SdkServerConfig {
                    id: "main".into(),
                    address: "http://a:5279".into(),
                    weight: 2,
                },
                SdkServerConfig {
                    id: "spare".into(),
                    address: "http://b:5279".into(),
                    weight: 1,
                },
            ]
        );
    }

    #[test]
    fn sdk_servers_reject_malformed_entries() {
        assert!(parse_sdk_servers("not-a-pair").is_err());
        assert!(parse_sdk_servers("a=http://x@heavy").is_err());
        assert!(parse_sdk_servers("").is_err());
    }
}

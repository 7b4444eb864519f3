// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The Caller: end-to-end execution of one client query.
//!
//! A Caller is built per request for one `(sdk endpoint, user)` pair. It
//! validates the query, runs pre-flight hooks, forwards to the SDK with
//! wallet-reload recovery, post-processes the response, and feeds the
//! cache. Whatever happens, `call` returns an envelope ready to be written
//! back to the client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tracing::{debug, error};

use crate::metrics::{Metrics, FAILURE_KIND_NET, FAILURE_KIND_RPC};
use crate::query::cache::QueryCache;
use crate::query::methods::{METHOD_GET, METHOD_STATUS, PARAM_URI};
use crate::query::Query;
use crate::rpc::client::RpcClient;
use crate::rpc::error::ProxyError;
use crate::rpc::{RpcRequest, RpcResponse};
use crate::wallet::{self, WalletErrorKind};

/// How many times a query is retried while its wallet is being reloaded.
pub const WALLET_LOAD_RETRIES: usize = 3;
/// Pause before reloading the wallet and retrying.
pub const WALLET_LOAD_RETRY_WAIT: Duration = Duration::from_millis(100);

/// Installation id reported by the predefined `status` response.
const STATUS_INSTALLATION_ID: &str =
    "692EAWhtoqDuAfQ6KHMXxFxt8tkhmt7sfprEMHWKjy5hf6PwZcHDV542VHqRnFnTCD";

/// A pre-flight hook returns a response to short-circuit the pipeline,
/// `None` to pass, or an error to abort.
pub type HookOutcome = Result<Option<RpcResponse>, ProxyError>;

/// Hooks may mutate the query before it is forwarded. Registration order
/// is meaningful: the cache lookup runs before method overrides.
pub type Hook =
    for<'a> fn(&'a Caller, &'a mut Query) -> Pin<Box<dyn Future<Output = HookOutcome> + Send + 'a>>;

struct HookEntry {
    /// Method filter; `None` runs the hook for every method.
    method: Option<&'static str>,
    hook: Hook,
}

pub struct Caller {
    client: RpcClient,
    user_id: i64,
    cache: Option<Arc<QueryCache>>,
    metrics: Arc<Metrics>,
    base_content_url: String,
    preflight_hooks: Vec<HookEntry>,
}

impl Caller {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        user_id: i64,
        cache: Option<Arc<QueryCache>>,
        metrics: Arc<Metrics>,
        base_content_url: impl Into<String>,
    ) -> Self {
        let mut caller = Self {
            client: RpcClient::new(http, endpoint),
            user_id,
            cache,
            metrics,
            base_content_url: base_content_url.into(),
            preflight_hooks: Vec::new(),
        };
        caller.add_default_hooks();
        caller
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint()
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Register a pre-flight hook, optionally filtered to one method.
    pub fn add_preflight_hook(&mut self, method: Option<&'static str>, hook: Hook) {
        self.preflight_hooks.push(HookEntry { method, hook });
    }

    fn add_default_hooks(&mut self) {
        self.add_preflight_hook(None, from_cache);
        self.add_preflight_hook(Some(METHOD_STATUS), predefined_status);
        self.add_preflight_hook(Some(METHOD_GET), preflight_get);
    }

    /// Execute one request. The returned envelope always echoes the
    /// request id and is ready for serialization.
    pub async fn call(&self, request: RpcRequest) -> RpcResponse {
        let id = request.id.clone();
        let method = request.method.clone();
        match self.call_inner(request).await {
            Ok(response) => response,
            Err(e) => {
                // Transport failures were already observed inside the retry
                // loop under the `net` kind.
                if e.failure_kind() != FAILURE_KIND_RPC {
                    self.metrics
                        .call_failed_durations
                        .with_label_values(&[method.as_str(), self.endpoint(), e.failure_kind()])
                        .observe(0.0);
                }
                e.into_response(id)
            }
        }
    }

    async fn call_inner(&self, request: RpcRequest) -> Result<RpcResponse, ProxyError> {
        let wallet_id = (self.user_id != 0).then(|| wallet::wallet_id(self.user_id));
        let mut query = Query::new(request, wallet_id)?;

        for entry in &self.preflight_hooks {
            let applies = entry.method.is_none_or(|m| m == query.method());
            if !applies {
                continue;
            }
            if let Some(response) = (entry.hook)(self, &mut query).await? {
                return Ok(response);
            }
        }

        let mut response = self.call_with_retry(&query).await?;
        self.post_process(&query, &mut response);

        if query.is_cacheable() && response.error.is_none() {
            if let (Some(cache), Some(result)) = (&self.cache, &response.result) {
                cache.save(query.method(), query.params(), result.clone());
            }
        }

        Ok(response)
    }

    /// Forward the query, reloading the wallet and retrying when the SDK
    /// reports it unloaded. A transport failure aborts immediately; any
    /// other outcome exits the loop. If retries run out, the last failing
    /// response is surfaced as-is.
    async fn call_with_retry(&self, query: &Query) -> Result<RpcResponse, ProxyError> {
        let mut last: Option<RpcResponse> = None;
        let mut duration = 0.0;

        for attempt in 0..WALLET_LOAD_RETRIES {
            let started = Instant::now();
            let sent = self.client.call(query.request()).await;
            duration = started.elapsed().as_secs_f64();
            self.metrics
                .call_durations
                .with_label_values(&[query.method(), self.endpoint()])
                .observe(duration);

            let response = match sent {
                Err(e) => {
                    error!(endpoint = self.endpoint(), error = %e, "error sending query");
                    self.metrics
                        .call_failed_durations
                        .with_label_values(&[query.method(), self.endpoint(), FAILURE_KIND_NET])
                        .observe(duration);
                    return Err(ProxyError::Sdk(e.to_string()));
                }
                Ok(response) => response,
            };

            if error_kind(&response) == Some(WalletErrorKind::NotLoaded) {
                tokio::time::sleep(WALLET_LOAD_RETRY_WAIT).await;
                if let Err(e) = wallet::add(&self.client, self.user_id).await {
                    if attempt >= WALLET_LOAD_RETRIES - 1 {
                        error!(
                            user_id = self.user_id,
                            endpoint = self.endpoint(),
                            retries = attempt,
                            error = %e,
                            "gave up manually adding wallet"
                        );
                    }
                }
                last = Some(response);
            } else if error_kind(&response) == Some(WalletErrorKind::AlreadyLoaded) {
                last = Some(response);
            } else {
                last = Some(response);
                break;
            }
        }

        let response = last.expect("retry loop ran at least once");
        if let Some(err) = &response.error {
            error!(
                method = query.method(),
                params = %query.params().to_value(),
                endpoint = self.endpoint(),
                user_id = self.user_id,
                duration,
                response = %err.message,
                "rpc call error"
            );
            self.metrics
                .call_failed_durations
                .with_label_values(&[query.method(), self.endpoint(), FAILURE_KIND_RPC])
                .observe(duration);
        } else {
            debug!(
                method = query.method(),
                endpoint = self.endpoint(),
                user_id = self.user_id,
                duration,
                "rpc call processed"
            );
        }
        Ok(response)
    }

    /// Rewrite response fields for methods that need gateway-side
    /// materialization. A no-op for everything else.
    fn post_process(&self, query: &Query, response: &mut RpcResponse) {
        if query.method() != METHOD_GET || response.error.is_some() {
            return;
        }
        let Some(Value::Object(result)) = response.result.as_mut() else {
            return;
        };
        let claim_name = result.get("claim_name").and_then(Value::as_str);
        let claim_id = result.get("claim_id").and_then(Value::as_str);
        if let (Some(name), Some(id)) = (claim_name, claim_id) {
            let streaming_url = format!("{}{name}/{id}", self.base_content_url);
            result.insert("streaming_url".into(), json!(streaming_url));
        }
    }
}

fn error_kind(response: &RpcResponse) -> Option<WalletErrorKind> {
    response
        .error
        .as_ref()
        .and_then(|e| wallet::classify(&e.message))
}

/// Serve cacheable queries from the cache, rewriting the stored result
/// onto the current request's id and version.
fn from_cache<'a>(
    caller: &'a Caller,
    query: &'a mut Query,
) -> Pin<Box<dyn Future<Output = HookOutcome> + Send + 'a>> {
    Box::pin(async move {
        let Some(cache) = &caller.cache else {
            return Ok(None);
        };
        if !query.is_cacheable() {
            return Ok(None);
        }
        match cache.retrieve(query.method(), query.params()) {
            None => Ok(None),
            Some(result) => {
                debug!(method = query.method(), "cached query");
                let mut response = query.new_response();
                response.result = Some(result);
                Ok(Some(response))
            }
        }
    })
}

/// `status` never reaches an SDK server: the gateway answers for itself
/// with a static, always-running daemon status.
fn predefined_status<'a>(
    _caller: &'a Caller,
    query: &'a mut Query,
) -> Pin<Box<dyn Future<Output = HookOutcome> + Send + 'a>> {
    Box::pin(async move {
        let mut response = query.new_response();
        response.result = Some(json!({
            "blob_manager": {"finished_blobs": 0},
            "connection_status": {
                "code": "connected",
                "message": "No connection problems detected",
            },
            "installation_id": STATUS_INSTALLATION_ID,
            "is_first_run": false,
            "is_running": true,
            "skipped_components": ["hash_announcer", "blob_server", "dht"],
            "startup_status": {
                "blob_manager": true,
                "blockchain_headers": true,
                "database": true,
                "exchange_rate_manager": true,
                "peer_protocol_server": true,
                "stream_manager": true,
                "upnp": true,
                "wallet": true,
            },
        }));
        Ok(Some(response))
    })
}

/// `get` must name the stream it wants; everything else about it is
/// handled after the SDK responds.
fn preflight_get<'a>(
    _caller: &'a Caller,
    query: &'a mut Query,
) -> Pin<Box<dyn Future<Output = HookOutcome> + Send + 'a>> {
    Box::pin(async move {
        let has_uri = query
            .params_map()
            .and_then(|p| p.get(PARAM_URI))
            .and_then(Value::as_str)
            .is_some();
        if !has_uri {
            return Err(ProxyError::InvalidParams(format!(
                "missing {PARAM_URI} parameter"
            )));
        }
        Ok(None)
    })
}

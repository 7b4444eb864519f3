// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! A client query on its way to an SDK server.
//!
//! `Query` wraps one parsed JSON-RPC request together with the wallet
//! identity of the calling user. Construction validates the method policy
//! and injects `wallet_id` where the method requires it, so a `Query` that
//! exists is always safe to forward.

pub mod cache;
pub mod caller;
pub mod methods;

use serde_json::{Map, Value};

use crate::rpc::error::ProxyError;
use crate::rpc::{Params, RpcRequest, RpcResponse};

use methods::{
    CACHE_RESOLVE_LONGER_THAN, METHOD_CLAIM_SEARCH, METHOD_RESOLVE, PARAM_ACCOUNT_ID,
    PARAM_URLS, PARAM_WALLET_ID,
};

#[derive(Debug, Clone)]
pub struct Query {
    request: RpcRequest,
    wallet_id: Option<String>,
}

impl Query {
    /// Validate the request against the method policy and attach the
    /// caller's wallet where required. `wallet_id` is `None` for
    /// unauthenticated callers.
    pub fn new(request: RpcRequest, wallet_id: Option<String>) -> Result<Self, ProxyError> {
        let mut q = Query { request, wallet_id };
        q.validate()?;
        q.attach_wallet_id();
        Ok(q)
    }

    pub fn method(&self) -> &str {
        &self.request.method
    }

    pub fn params(&self) -> &Params {
        &self.request.params
    }

    /// Named params, or `None` when params are absent or positional.
    pub fn params_map(&self) -> Option<&Map<String, Value>> {
        self.request.params.as_map()
    }

    pub fn request(&self) -> &RpcRequest {
        &self.request
    }

    pub fn is_authenticated(&self) -> bool {
        self.wallet_id.is_some()
    }

    /// A query is cacheable for long `resolve` requests and for every
    /// `claim_search`.
    pub fn is_cacheable(&self) -> bool {
        if self.method() == METHOD_RESOLVE {
            if let Some(Value::Array(urls)) = self.params_map().and_then(|p| p.get(PARAM_URLS)) {
                return urls.len() > CACHE_RESOLVE_LONGER_THAN;
            }
            return false;
        }
        self.method() == METHOD_CLAIM_SEARCH
    }

    /// An empty response carrying this query's `id` and `jsonrpc` fields,
    /// used for cache hits and predefined replies.
    pub fn new_response(&self) -> RpcResponse {
        RpcResponse {
            id: self.request.id.clone(),
            jsonrpc: self.request.jsonrpc.clone(),
            result: None,
            error: None,
        }
    }

    fn validate(&self) -> Result<(), ProxyError> {
        let method = self.method();

        if methods::is_forbidden(method) {
            return Err(ProxyError::MethodNotAllowed("forbidden method".into()));
        }
        if !methods::is_known(method) {
            return Err(ProxyError::MethodNotAllowed("unknown method".into()));
        }

        if let Some(params) = self.params_map() {
            if params.contains_key(PARAM_ACCOUNT_ID) {
                return Err(ProxyError::InvalidParams(format!(
                    "forbidden parameter supplied: {PARAM_ACCOUNT_ID}"
                )));
            }
        }

        if methods::is_wallet_specific(method) {
            if matches!(self.request.params, Params::ByPosition(_)) {
                return Err(ProxyError::InvalidParams(
                    "positional parameters are not accepted for this method".into(),
                ));
            }
            if methods::needs_auth(method) && self.wallet_id.is_none() {
                return Err(ProxyError::AuthRequired);
            }
        }

        Ok(())
    }

    /// Inject `wallet_id` for wallet-specific methods, promoting absent
    /// params to a fresh map.
    fn attach_wallet_id(&mut self) {
        let Some(wallet_id) = &self.wallet_id else {
            return;
        };
        if !methods::is_wallet_specific(self.method()) {
            return;
        }
        if let Params::ByName(map) = &mut self.request.params {
            map.insert(PARAM_WALLET_ID.into(), Value::String(wallet_id.clone()));
        } else if self.request.params.is_absent() {
            let mut map = Map::new();
            map.insert(PARAM_WALLET_ID.into(), Value::String(wallet_id.clone()));
            self.request.params = Params::ByName(map);
        }
        // Positional params on wallet methods were rejected in validate().
    }
}

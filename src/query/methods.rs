// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Method policy tables.
//!
//! Every client-callable SDK method falls into one of three buckets:
//! relaxed (no wallet needed), wallet-specific (gets `wallet_id` injected),
//! or forbidden (never forwarded). Anything outside these tables is
//! rejected as unknown.

/// Number of urls in a `resolve` call above which the response is cached.
pub const CACHE_RESOLVE_LONGER_THAN: usize = 10;

pub const METHOD_GET: &str = "get";
pub const METHOD_STATUS: &str = "status";
pub const METHOD_RESOLVE: &str = "resolve";
pub const METHOD_CLAIM_SEARCH: &str = "claim_search";
pub const METHOD_WALLET_LIST: &str = "wallet_list";
pub const METHOD_WALLET_ADD: &str = "wallet_add";
pub const METHOD_WALLET_CREATE: &str = "wallet_create";
pub const METHOD_WALLET_REMOVE: &str = "wallet_remove";

pub const PARAM_ACCOUNT_ID: &str = "account_id";
pub const PARAM_WALLET_ID: &str = "wallet_id";
pub const PARAM_URLS: &str = "urls";
pub const PARAM_URI: &str = "uri";

/// Methods which are allowed to be called without a wallet.
pub const RELAXED_METHODS: &[&str] = &[
    "blob_announce",
    "status",
    "resolve",
    "transaction_show",
    "stream_cost_estimate",
    "claim_search",
    "comment_list",
    "version",
    "routing_table_get",
];

/// Methods which require `wallet_id` to be injected before forwarding.
pub const WALLET_SPECIFIC_METHODS: &[&str] = &[
    "get",
    "publish",

    "address_unused",
    "address_list",
    "address_is_mine",

    "account_list",
    "account_balance",
    "account_send",
    "account_max_address_gap",

    "channel_abandon",
    "channel_create",
    "channel_list",
    "channel_update",
    "channel_export",
    "channel_import",

    "comment_abandon",
    "comment_create",
    "comment_hide",
    "comment_update",

    "claim_list",

    "stream_abandon",
    "stream_create",
    "stream_list",
    "stream_update",
    "stream_repost",

    "support_abandon",
    "support_create",
    "support_list",

    "sync_apply",
    "sync_hash",

    "preference_get",
    "preference_set",

    "transaction_list",

    "txo_list",
    "txo_sum",
    "txo_plot",

    "utxo_list",
    "utxo_release",

    "wallet_list",
    "wallet_send",
    "wallet_balance",
    "wallet_encrypt",
    "wallet_decrypt",
    "wallet_lock",
    "wallet_unlock",
    "wallet_status",
];

/// Methods that are never forwarded to an SDK server.
pub const FORBIDDEN_METHODS: &[&str] = &[
    "stop",

    "account_add",
    "account_create",
    "account_lock",
    "account_unlock",

    "file_delete",
    "file_list",
    "file_reflect",
    "file_save",
    "file_set_status",

    "peer_list",
    "peer_ping",

    "wallet_add",
    "wallet_create",
    "wallet_remove",

    "blob_get",
    "blob_reflect_all",
    "blob_list",
    "blob_delete",
    "blob_reflect",

    "settings_get",
    "settings_set",
];

pub fn is_relaxed(method: &str) -> bool {
    RELAXED_METHODS.contains(&method)
}

pub fn is_wallet_specific(method: &str) -> bool {
    WALLET_SPECIFIC_METHODS.contains(&method)
}

pub fn is_forbidden(method: &str) -> bool {
    FORBIDDEN_METHODS.contains(&method)
}

pub fn is_known(method: &str) -> bool {
    is_relaxed(method) || is_wallet_specific(method) || is_forbidden(method)
}

/// True for methods that cannot be served without a resolved user.
pub fn needs_auth(method: &str) -> bool {
    is_wallet_specific(method) && !is_relaxed(method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_do_not_leak_into_each_other() {
        for m in RELAXED_METHODS {
            assert!(!is_forbidden(m), "{m} is both relaxed and forbidden");
        }
        for m in WALLET_SPECIFIC_METHODS {
            assert!(!is_forbidden(m), "{m} is both wallet-specific and forbidden");
        }
    }

    #[test]
    fn auth_is_needed_exactly_for_wallet_methods() {
        assert!(needs_auth("wallet_balance"));
        assert!(needs_auth("account_list"));
        assert!(needs_auth("get"));
        assert!(!needs_auth("resolve"));
        assert!(!needs_auth("status"));
        // Forbidden and unknown methods are rejected by validation, not by
        // the auth gate.
        assert!(!needs_auth("stop"));
        assert!(!needs_auth("no_such_method"));
    }

    #[test]
    fn wallet_mutation_methods_stay_internal() {
        for m in [METHOD_WALLET_ADD, METHOD_WALLET_CREATE, METHOD_WALLET_REMOVE] {
            assert!(is_forbidden(m));
        }
        assert!(is_wallet_specific(METHOD_WALLET_LIST));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process mock servers for tests.
//!
//! `MockRpcServer` stands in for an SDK server or the identity service:
//! it answers every POST with the next queued response (or an empty
//! result) and records request bodies for assertions.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Clone)]
pub struct MockRpcServer {
    address: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    responses: Arc<Mutex<VecDeque<Value>>>,
}

impl MockRpcServer {
    /// Bind to an ephemeral port and start serving in the background. The
    /// task dies with the test runtime.
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let server = Self {
            address: listener.local_addr().expect("local addr"),
            requests: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(VecDeque::new())),
        };
        let app = Router::new().fallback(handle).with_state(server.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        server
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.address)
    }

    /// Queue the next response body. Without queued responses the server
    /// answers with an empty result.
    pub fn queue(&self, response: Value) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Request bodies received so far, parsed as JSON where possible.
    pub fn received(&self) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())))
            .collect()
    }
}

async fn handle(State(server): State<MockRpcServer>, body: String) -> Json<Value> {
    server.requests.lock().unwrap().push(body);
    let response = server
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| json!({"jsonrpc": "2.0", "result": {}}));
    Json(response)
}

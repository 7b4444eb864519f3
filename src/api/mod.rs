// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{extract::State, middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::auth::middleware::auth_middleware;
use crate::state::AppState;

pub mod proxy;
pub mod status;

pub fn router(state: AppState) -> Router {
    // The auth middleware wraps only the proxy endpoint; everything else
    // is public.
    let v1_routes = Router::new()
        .route(
            "/proxy",
            post(proxy::handle).options(proxy::preflight),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route("/status", get(status::status));

    Router::new()
        .nest("/api/v1", v1_routes)
        .route("/internal/metrics", get(metrics_exposition))
        .route("/api-doc/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .with_state(state)
}

async fn metrics_exposition(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.export(),
    )
        .into_response()
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Browser clients call the proxy from anywhere; CORS is wide open with
/// the auth token header whitelisted.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-lbry-auth-token"),
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(Duration::from_secs(7200))
}

#[derive(OpenApi)]
#[openapi(
    paths(status::status),
    components(schemas(status::StatusResponse, status::SdkServerStatus)),
    tags(
        (name = "Status", description = "Gateway health and SDK pool state")
    )
)]
struct ApiDoc;

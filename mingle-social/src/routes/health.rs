use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mingle_shared::clients::store::{collections, DocumentStore};
use mingle_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let check = match state.store.get(collections::USERS, "__health__").await {
        Ok(_) => HealthCheck::healthy(state.store.backend_name()),
        Err(e) => HealthCheck::unhealthy(state.store.backend_name(), e.to_string()),
    };

    let response = HealthResponse::healthy("mingle-social", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![check]);

    let status = match response.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status, Json(response)).into_response()
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|h| h.render())
        .unwrap_or_default()
}

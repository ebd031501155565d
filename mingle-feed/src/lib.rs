pub mod config;
pub mod recommend;
pub mod routes;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use mingle_shared::clients::store::DocumentStore;

use config::AppConfig;
use recommend::Recommender;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub recommender: Recommender,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Feed
        .route("/feed/posts", get(routes::feed::search_posts))
        .route("/feed/users", get(routes::feed::search_users))
        .layer(axum::middleware::from_fn(mingle_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub mod config;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use mingle_shared::clients::blob::BlobStorage;
use mingle_shared::clients::store::DocumentStore;

use config::AppConfig;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStorage>,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Profiles
        .route("/me", get(routes::profile::get_own).patch(routes::profile::update_own))
        .route("/me/account", post(routes::profile::create_account))
        .route("/me/picture", post(routes::profile::upload_picture).layer(upload_limit.clone()))
        .route("/users/:id", get(routes::profile::get_public))
        // Follows
        .route("/users/:id/follow", put(routes::follows::follow).delete(routes::follows::unfollow))
        .route("/users/:id/follow/toggle", post(routes::follows::toggle_follow))
        .route("/users/:id/followers", get(routes::follows::list_followers))
        .route("/users/:id/following", get(routes::follows::list_following))
        // Posts
        .route("/posts", post(routes::posts::create_post).layer(upload_limit))
        .route("/users/:id/posts", get(routes::posts::list_user_posts))
        .route(
            "/posts/:id",
            get(routes::posts::get_post)
                .patch(routes::posts::edit_post)
                .delete(routes::posts::delete_post),
        )
        .route("/posts/:id/like", post(routes::posts::toggle_like))
        // Comment threads
        .route("/posts/:id/comments", post(routes::comments::add_comment))
        .route(
            "/posts/:id/comments/:comment_id",
            patch(routes::comments::edit_comment).delete(routes::comments::delete_comment),
        )
        .route("/posts/:id/comments/:comment_id/like", post(routes::comments::toggle_comment_like))
        .route("/posts/:id/comments/:comment_id/replies", post(routes::comments::add_reply))
        .route(
            "/posts/:id/comments/:comment_id/replies/:reply_id",
            patch(routes::comments::edit_reply).delete(routes::comments::delete_reply),
        )
        .route(
            "/posts/:id/comments/:comment_id/replies/:reply_id/like",
            post(routes::comments::toggle_reply_like),
        )
        // Notifications
        .route("/notifications", get(routes::notifications::list_notifications))
        .route("/notifications/unread-count", get(routes::notifications::unread_count))
        .route("/notifications/read-all", put(routes::notifications::mark_all_read))
        .route("/notifications/:id/read", put(routes::notifications::mark_read))
        // Live views (SSE)
        .route("/live/users/:id", get(routes::live::profile_view))
        .route("/live/users/:id/posts", get(routes::live::user_posts))
        .route("/live/notifications", get(routes::live::notifications))
        .layer(axum::middleware::from_fn(mingle_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

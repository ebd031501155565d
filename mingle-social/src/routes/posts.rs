use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;

use mingle_shared::errors::AppResult;
use mingle_shared::models::{split_csv, Post};
use mingle_shared::types::auth::AuthUser;
use mingle_shared::types::ApiResponse;

use crate::services::post_service::{self, EditPostRequest, NewPost};
use crate::AppState;

// --- POST /posts ---

/// Multipart form: `file` (image or video), `description`, and `tags` as
/// comma separated text.
pub async fn create_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Post>>> {
    let mut form = super::read_upload_form(multipart).await?;
    let new_post = NewPost {
        description: form.fields.remove("description").unwrap_or_default(),
        tags: form.fields.remove("tags").map(|t| split_csv(&t)).unwrap_or_default(),
        media: form.media,
    };

    let post = post_service::create_post(state.store.as_ref(), state.blobs.as_ref(), &user.id, new_post).await?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- GET /users/:id/posts ---

pub async fn list_user_posts(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<Post>>>> {
    let posts = post_service::list_user_posts(state.store.as_ref(), &user_id).await?;
    Ok(Json(ApiResponse::ok(posts)))
}

// --- GET /posts/:id ---

pub async fn get_post(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post = post_service::load(state.store.as_ref(), &post_id).await?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- PATCH /posts/:id ---

pub async fn edit_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    Json(req): Json<EditPostRequest>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post = post_service::edit_post(state.store.as_ref(), &user.id, &post_id, req).await?;
    tracing::info!(post_id = %post_id, user_id = %user.id, "post edited");
    Ok(Json(ApiResponse::ok(post)))
}

// --- DELETE /posts/:id ---

pub async fn delete_post(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    post_service::delete_post(state.store.as_ref(), &user.id, &post_id).await?;
    Ok(Json(ApiResponse::ok_with_message((), "post deleted")))
}

// --- POST /posts/:id/like ---

pub async fn toggle_like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post = post_service::toggle_like(state.store.as_ref(), &user.id, &post_id).await?;
    tracing::debug!(post_id = %post_id, user_id = %user.id, likes = post.likes.len(), "post like toggled");
    Ok(Json(ApiResponse::ok(post)))
}

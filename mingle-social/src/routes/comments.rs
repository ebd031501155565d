use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use mingle_shared::errors::AppResult;
use mingle_shared::models::Post;
use mingle_shared::types::auth::AuthUser;
use mingle_shared::types::ApiResponse;

use crate::services::post_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub text: String,
}

// --- POST /posts/:id/comments ---

pub async fn add_comment(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
    Json(body): Json<TextBody>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post = post_service::add_comment(state.store.as_ref(), &user.id, &post_id, &body.text).await?;
    tracing::info!(post_id = %post_id, user_id = %user.id, "comment added");
    Ok(Json(ApiResponse::ok(post)))
}

// --- PATCH /posts/:id/comments/:comment_id ---

pub async fn edit_comment(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(String, String)>,
    Json(body): Json<TextBody>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post =
        post_service::edit_comment(state.store.as_ref(), &user.id, &post_id, &comment_id, &body.text).await?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- DELETE /posts/:id/comments/:comment_id ---

pub async fn delete_comment(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post = post_service::delete_comment(state.store.as_ref(), &user.id, &post_id, &comment_id).await?;
    tracing::info!(post_id = %post_id, comment_id = %comment_id, user_id = %user.id, "comment deleted");
    Ok(Json(ApiResponse::ok(post)))
}

// --- POST /posts/:id/comments/:comment_id/like ---

pub async fn toggle_comment_like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post = post_service::toggle_comment_like(state.store.as_ref(), &user.id, &post_id, &comment_id).await?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- POST /posts/:id/comments/:comment_id/replies ---

pub async fn add_reply(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id)): Path<(String, String)>,
    Json(body): Json<TextBody>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post =
        post_service::add_reply(state.store.as_ref(), &user.id, &post_id, &comment_id, &body.text).await?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- PATCH /posts/:id/comments/:comment_id/replies/:reply_id ---

pub async fn edit_reply(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id, reply_id)): Path<(String, String, String)>,
    Json(body): Json<TextBody>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post = post_service::edit_reply(
        state.store.as_ref(),
        &user.id,
        &post_id,
        &comment_id,
        &reply_id,
        &body.text,
    )
    .await?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- DELETE /posts/:id/comments/:comment_id/replies/:reply_id ---

pub async fn delete_reply(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id, reply_id)): Path<(String, String, String)>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post =
        post_service::delete_reply(state.store.as_ref(), &user.id, &post_id, &comment_id, &reply_id).await?;
    Ok(Json(ApiResponse::ok(post)))
}

// --- POST /posts/:id/comments/:comment_id/replies/:reply_id/like ---

pub async fn toggle_reply_like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((post_id, comment_id, reply_id)): Path<(String, String, String)>,
) -> AppResult<Json<ApiResponse<Post>>> {
    let post =
        post_service::toggle_reply_like(state.store.as_ref(), &user.id, &post_id, &comment_id, &reply_id).await?;
    Ok(Json(ApiResponse::ok(post)))
}

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use mingle_shared::errors::AppResult;
use mingle_shared::models::UserProfile;
use mingle_shared::types::auth::AuthUser;
use mingle_shared::types::ApiResponse;

use crate::services::follow_service::{self, FollowState};
use crate::AppState;

// --- PUT /users/:id/follow ---

pub async fn follow(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<String>,
) -> AppResult<Json<ApiResponse<FollowState>>> {
    let state_after = follow_service::follow(state.store.as_ref(), &user.id, &target_id).await?;
    Ok(Json(ApiResponse::ok(state_after)))
}

// --- DELETE /users/:id/follow ---

pub async fn unfollow(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<String>,
) -> AppResult<Json<ApiResponse<FollowState>>> {
    let state_after = follow_service::unfollow(state.store.as_ref(), &user.id, &target_id).await?;
    Ok(Json(ApiResponse::ok(state_after)))
}

// --- POST /users/:id/follow/toggle ---

pub async fn toggle_follow(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<String>,
) -> AppResult<Json<ApiResponse<FollowState>>> {
    let state_after = follow_service::toggle_follow(state.store.as_ref(), &user.id, &target_id).await?;
    Ok(Json(ApiResponse::ok(state_after)))
}

// --- GET /users/:id/followers ---

pub async fn list_followers(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<UserProfile>>>> {
    let profiles = follow_service::list_followers(state.store.as_ref(), &user_id).await?;
    Ok(Json(ApiResponse::ok(profiles)))
}

// --- GET /users/:id/following ---

pub async fn list_following(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<UserProfile>>>> {
    let profiles = follow_service::list_following(state.store.as_ref(), &user_id).await?;
    Ok(Json(ApiResponse::ok(profiles)))
}

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::Json;

use mingle_shared::errors::AppResult;
use mingle_shared::models::UserProfile;
use mingle_shared::types::auth::AuthUser;
use mingle_shared::types::ApiResponse;

use crate::services::profile_service::{self, CreateAccountRequest, UpdateProfile};
use crate::AppState;

// --- POST /me/account ---

pub async fn create_account(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAccountRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile =
        profile_service::create_account(state.store.as_ref(), &user.id, user.email.as_deref(), req).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- GET /me ---

pub async fn get_own(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = profile_service::get_own(state.store.as_ref(), &user.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- PATCH /me ---

pub async fn update_own(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfile>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = profile_service::update_own(state.store.as_ref(), &user.id, req).await?;
    tracing::info!(user_id = %user.id, "profile updated");
    Ok(Json(ApiResponse::ok(profile)))
}

// --- POST /me/picture ---

pub async fn upload_picture(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let media = super::read_upload_form(multipart)
        .await?
        .media
        .ok_or_else(|| mingle_shared::AppError::bad_request("no file provided"))?;

    let profile =
        profile_service::upload_picture(state.store.as_ref(), state.blobs.as_ref(), &user.id, media).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- GET /users/:id ---

pub async fn get_public(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = profile_service::get_public(state.store.as_ref(), &user_id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

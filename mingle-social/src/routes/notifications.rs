use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;

use mingle_shared::errors::AppResult;
use mingle_shared::models::Notification;
use mingle_shared::types::auth::AuthUser;
use mingle_shared::types::pagination::{Paginated, PaginationParams};
use mingle_shared::types::ApiResponse;

use crate::services::notification_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

// --- GET /notifications ---

pub async fn list_notifications(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Notification>>>> {
    let page = notification_service::list_notifications(state.store.as_ref(), &user.id, &params).await?;
    Ok(Json(ApiResponse::ok(page)))
}

// --- GET /notifications/unread-count ---

pub async fn unread_count(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UnreadCount>>> {
    let count = notification_service::count_unread(state.store.as_ref(), &user.id).await?;
    Ok(Json(ApiResponse::ok(UnreadCount { count })))
}

// --- PUT /notifications/:id/read ---

pub async fn mark_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<String>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let notification =
        notification_service::mark_read(state.store.as_ref(), &user.id, &notification_id).await?;
    Ok(Json(ApiResponse::ok(notification)))
}

// --- PUT /notifications/read-all ---

pub async fn mark_all_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MarkAllReadResponse>>> {
    let updated = notification_service::mark_all_read(state.store.as_ref(), &user.id).await?;
    Ok(Json(ApiResponse::ok(MarkAllReadResponse { updated })))
}

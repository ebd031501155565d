use futures::future::join_all;

use mingle_shared::clients::store::{
    collections, encode_fields, Direction, DocumentStore, DocumentStoreExt, FieldUpdate, Query,
};
use mingle_shared::errors::{AppError, AppResult, ErrorCode};
use mingle_shared::models::{Notification, NotificationKind};
use mingle_shared::types::pagination::{Paginated, PaginationParams};

/// Create a notification for `to` unless the actor is notifying themselves.
///
/// Best effort: a failed write is logged and swallowed so the interaction
/// that triggered it still succeeds.
pub async fn notify(
    store: &dyn DocumentStore,
    kind: NotificationKind,
    from: &str,
    to: &str,
    post_id: Option<&str>,
) -> Option<Notification> {
    if from == to || to.is_empty() {
        return None;
    }

    let notification = Notification::new(kind, from, to, post_id.map(str::to_string));
    let fields = match encode_fields(&notification) {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode notification");
            return None;
        }
    };

    match store.create(collections::NOTIFICATIONS, None, fields).await {
        Ok(doc) => {
            metrics::counter!("mingle_notifications_created_total", "type" => kind.as_str()).increment(1);
            tracing::debug!(
                notification_id = %doc.id,
                to_user_id = %to,
                notification_type = ?kind,
                "notification created"
            );
            Some(Notification { id: doc.id, ..notification })
        }
        Err(e) => {
            metrics::counter!("mingle_notifications_failed_total", "type" => kind.as_str()).increment(1);
            tracing::warn!(error = %e, to_user_id = %to, notification_type = ?kind, "failed to create notification");
            None
        }
    }
}

/// The caller's notifications, newest first.
pub fn notifications_query(user_id: &str) -> Query {
    Query::collection(collections::NOTIFICATIONS)
        .where_eq("toUserId", user_id)
        .order_by("createdAt", Direction::Descending)
}

/// List notifications for a user with pagination.
pub async fn list_notifications(
    store: &dyn DocumentStore,
    user_id: &str,
    params: &PaginationParams,
) -> AppResult<Paginated<Notification>> {
    let all: Vec<Notification> = store.query_as_lossy(&notifications_query(user_id)).await?;
    Ok(Paginated::from_all(all, params))
}

/// Count unread notifications for a user.
pub async fn count_unread(store: &dyn DocumentStore, user_id: &str) -> AppResult<usize> {
    let query = Query::collection(collections::NOTIFICATIONS)
        .where_eq("toUserId", user_id)
        .where_eq("read", false);
    Ok(store.query(&query).await?.len())
}

/// Mark a single notification as read. Only its recipient may do so.
pub async fn mark_read(store: &dyn DocumentStore, user_id: &str, notification_id: &str) -> AppResult<Notification> {
    let notification: Notification = store
        .get_as(collections::NOTIFICATIONS, notification_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::NotificationNotFound, "notification not found"))?;

    if notification.to_user_id != user_id {
        return Err(AppError::forbidden("not your notification"));
    }
    if notification.read {
        return Ok(notification);
    }

    let doc = store
        .update(
            collections::NOTIFICATIONS,
            notification_id,
            vec![("read".to_string(), FieldUpdate::set(true)?)],
        )
        .await?;
    Ok(doc.decode()?)
}

/// Mark every unread notification of a user as read; returns how many changed.
pub async fn mark_all_read(store: &dyn DocumentStore, user_id: &str) -> AppResult<usize> {
    let query = Query::collection(collections::NOTIFICATIONS)
        .where_eq("toUserId", user_id)
        .where_eq("read", false);
    let unread = store.query(&query).await?;

    let read = FieldUpdate::set(true)?;
    let results = join_all(unread.iter().map(|doc| {
        store.update(collections::NOTIFICATIONS, &doc.id, vec![("read".to_string(), read.clone())])
    }))
    .await;

    let mut updated = 0;
    for result in results {
        result?;
        updated += 1;
    }

    tracing::debug!(user_id = %user_id, updated, "notifications marked read");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mingle_shared::clients::store::MemoryStore;

    #[tokio::test]
    async fn self_notifications_are_skipped() {
        let store = MemoryStore::new();
        assert!(notify(&store, NotificationKind::PostLike, "u1", "u1", Some("p1")).await.is_none());
        assert_eq!(count_unread(&store, "u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unread_count_and_mark_all() {
        let store = MemoryStore::new();
        notify(&store, NotificationKind::PostLike, "a", "owner", Some("p1")).await.unwrap();
        notify(&store, NotificationKind::NewComment, "b", "owner", Some("p1")).await.unwrap();
        notify(&store, NotificationKind::CommentLike, "owner", "a", Some("p1")).await.unwrap();

        assert_eq!(count_unread(&store, "owner").await.unwrap(), 2);
        assert_eq!(mark_all_read(&store, "owner").await.unwrap(), 2);
        assert_eq!(count_unread(&store, "owner").await.unwrap(), 0);
        assert_eq!(count_unread(&store, "a").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn only_recipient_marks_read() {
        let store = MemoryStore::new();
        let n = notify(&store, NotificationKind::PostLike, "a", "owner", Some("p1")).await.unwrap();

        let err = mark_read(&store, "a", &n.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let read = mark_read(&store, "owner", &n.id).await.unwrap();
        assert!(read.read);
        assert_eq!(read.message, "liked your post");

        let err = mark_read(&store, "owner", "missing").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotificationNotFound);
    }

    #[tokio::test]
    async fn list_is_paginated() {
        let store = MemoryStore::new();
        for from in ["a", "b", "c"] {
            notify(&store, NotificationKind::PostLike, from, "owner", None).await.unwrap();
        }
        let page = list_notifications(&store, "owner", &PaginationParams { page: 2, per_page: 2 })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 2);
    }
}

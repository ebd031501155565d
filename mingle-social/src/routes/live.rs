//! Server-Sent Events views over the store's watch streams.
//!
//! Each stream starts with the current snapshot and then emits a new
//! `snapshot` event on every change. A deleted or missing profile yields a
//! `missing` event; store or decode failures yield an `error` event and the
//! stream keeps going. A heartbeat comment is sent every 15 seconds.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;

use mingle_shared::clients::store::{collections, Document, DocumentStore, StoreResult};
use mingle_shared::models::{Notification, Post, UserProfile};
use mingle_shared::types::auth::AuthUser;

use crate::services::{notification_service, post_service};
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub is_following: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiveUpdate<T> {
    Snapshot(T),
    Missing,
    Error(String),
}

impl<T: Serialize> LiveUpdate<T> {
    fn into_event(self) -> SseEvent {
        match self {
            LiveUpdate::Snapshot(value) => match SseEvent::default().event("snapshot").json_data(&value) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "live view: failed to serialize snapshot");
                    error_event(&e.to_string())
                }
            },
            LiveUpdate::Missing => SseEvent::default().event("missing").data("{}"),
            LiveUpdate::Error(message) => error_event(&message),
        }
    }
}

fn error_event(message: &str) -> SseEvent {
    let body = serde_json::json!({ "message": message });
    SseEvent::default().event("error").data(body.to_string())
}

fn decode_all<T: serde::de::DeserializeOwned>(snapshot: StoreResult<Vec<Document>>) -> LiveUpdate<Vec<T>> {
    let decoded = snapshot.and_then(|docs| docs.iter().map(|d| d.decode()).collect::<StoreResult<Vec<T>>>());
    match decoded {
        Ok(items) => LiveUpdate::Snapshot(items),
        Err(e) => {
            tracing::warn!(error = %e, "live view: query snapshot failed");
            LiveUpdate::Error(e.to_string())
        }
    }
}

/// Profile snapshots of `target` as seen by `viewer`.
pub fn profile_updates(
    store: &dyn DocumentStore,
    target: &str,
    viewer: String,
) -> impl Stream<Item = LiveUpdate<ProfileView>> + Send + 'static {
    store
        .watch_document(collections::USERS, target)
        .map(move |snapshot| match snapshot.and_then(|doc| doc.map(|d| d.decode::<UserProfile>()).transpose()) {
            Ok(Some(profile)) => {
                let is_following = profile.is_followed_by(&viewer);
                LiveUpdate::Snapshot(ProfileView {
                    profile: profile.with_display_defaults(),
                    is_following,
                })
            }
            Ok(None) => LiveUpdate::Missing,
            Err(e) => {
                tracing::warn!(error = %e, "live view: profile snapshot failed");
                LiveUpdate::Error(e.to_string())
            }
        })
}

pub fn post_updates(store: &dyn DocumentStore, owner: &str) -> impl Stream<Item = LiveUpdate<Vec<Post>>> + Send + 'static {
    store
        .watch_query(post_service::user_posts_query(owner))
        .map(decode_all::<Post>)
}

pub fn notification_updates(
    store: &dyn DocumentStore,
    user_id: &str,
) -> impl Stream<Item = LiveUpdate<Vec<Notification>>> + Send + 'static {
    store
        .watch_query(notification_service::notifications_query(user_id))
        .map(decode_all::<Notification>)
}

fn into_sse<T: Serialize + Send + 'static>(
    updates: impl Stream<Item = LiveUpdate<T>> + Send + 'static,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let stream = async_stream::stream! {
        futures::pin_mut!(updates);
        while let Some(update) = updates.next().await {
            yield Ok(update.into_event());
        }
        tracing::info!("live view stream ended");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

/// `GET /live/users/:id` -- profile view with the caller's follow state.
pub async fn profile_view(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<String>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    tracing::info!(user_id = %user.id, target_id = %target_id, "live profile view opened");
    into_sse(profile_updates(state.store.as_ref(), &target_id, user.id))
}

/// `GET /live/users/:id/posts` -- a user's posts, newest first.
pub async fn user_posts(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    tracing::info!(user_id = %user.id, owner = %owner_id, "live post list opened");
    into_sse(post_updates(state.store.as_ref(), &owner_id))
}

/// `GET /live/notifications` -- the caller's notifications, newest first.
pub async fn notifications(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    tracing::info!(user_id = %user.id, "live notifications opened");
    into_sse(notification_updates(state.store.as_ref(), &user.id))
}

//! Post lifecycle and the read-derive-write orchestration around [`thread`].
//!
//! Every interaction loads the whole post, derives the new `likes` or
//! `comments` value and writes that one field back. Concurrent writers to the
//! same field race and the last write wins.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use mingle_shared::clients::blob::BlobStorage;
use mingle_shared::clients::store::{
    collections, encode_fields, Direction, DocumentStore, DocumentStoreExt, FieldUpdate, Query,
};
use mingle_shared::errors::{AppError, AppResult, ErrorCode};
use mingle_shared::models::{MediaType, NotificationKind, Post};

use super::notification_service;
use super::thread::{self, Toggled};

/// Uploaded media for a new post.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub content_type: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub description: String,
    pub tags: Vec<String>,
    pub media: Option<MediaUpload>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EditPostRequest {
    #[validate(length(max = 2200))]
    pub description: Option<String>,
    #[validate(length(max = 30))]
    pub tags: Option<Vec<String>>,
}

pub async fn load(store: &dyn DocumentStore, post_id: &str) -> AppResult<Post> {
    store
        .get_as(collections::POSTS, post_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::PostNotFound, "post not found"))
}

async fn write_field<T: serde::Serialize>(
    store: &dyn DocumentStore,
    post_id: &str,
    field: &str,
    value: T,
) -> AppResult<Post> {
    let doc = store
        .update(collections::POSTS, post_id, vec![(field.to_string(), FieldUpdate::set(value)?)])
        .await?;
    Ok(doc.decode()?)
}

/// File extension for an upload key: the client's file name wins, then the
/// content type's subtype.
fn extension(media: &MediaUpload) -> String {
    media
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext))
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .or_else(|| media.content_type.split('/').nth(1))
        .unwrap_or("bin")
        .to_ascii_lowercase()
}

/// Upload media under `{prefix}/{uid}/{random}.{ext}` and return its URL.
pub async fn upload_media(
    blobs: &dyn BlobStorage,
    prefix: &str,
    user_id: &str,
    media: MediaUpload,
) -> AppResult<String> {
    let key = format!("{prefix}/{user_id}/{}.{}", Uuid::new_v4(), extension(&media));
    blobs
        .upload(&key, media.bytes, &media.content_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, key = %key, "media upload failed");
            AppError::new(ErrorCode::MediaUploadFailed, "media upload failed")
        })
}

pub async fn create_post(
    store: &dyn DocumentStore,
    blobs: &dyn BlobStorage,
    user_id: &str,
    new_post: NewPost,
) -> AppResult<Post> {
    let media = new_post
        .media
        .ok_or_else(|| AppError::bad_request("a post needs an image or video"))?;
    let media_type = MediaType::from_content_type(&media.content_type).ok_or_else(|| {
        AppError::new(ErrorCode::UnsupportedMedia, "only image and video uploads are supported")
    })?;

    let media_uri = upload_media(blobs, "posts", user_id, media).await?;

    let post = Post {
        owner_id: user_id.to_string(),
        media_type,
        media_uri,
        tags: new_post
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        description: new_post.description.trim().to_string(),
        ..Post::default()
    };

    let doc = store.create(collections::POSTS, None, encode_fields(&post)?).await?;
    tracing::info!(post_id = %doc.id, owner_id = %user_id, media_type = ?media_type, "post created");
    Ok(doc.decode()?)
}

fn ensure_owner(post: &Post, user_id: &str) -> AppResult<()> {
    if post.owner_id != user_id {
        return Err(AppError::new(ErrorCode::NotAuthor, "only the post owner can change this post"));
    }
    Ok(())
}

pub async fn edit_post(
    store: &dyn DocumentStore,
    user_id: &str,
    post_id: &str,
    req: EditPostRequest,
) -> AppResult<Post> {
    req.validate()?;
    let post = load(store, post_id).await?;
    ensure_owner(&post, user_id)?;

    let mut updates = Vec::new();
    if let Some(description) = req.description {
        updates.push(("description".to_string(), FieldUpdate::set(description.trim())?));
    }
    if let Some(tags) = req.tags {
        let tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        updates.push(("tags".to_string(), FieldUpdate::set(tags)?));
    }
    if updates.is_empty() {
        return Ok(post);
    }

    let doc = store.update(collections::POSTS, post_id, updates).await?;
    Ok(doc.decode()?)
}

pub async fn delete_post(store: &dyn DocumentStore, user_id: &str, post_id: &str) -> AppResult<()> {
    let post = load(store, post_id).await?;
    ensure_owner(&post, user_id)?;
    store.delete(collections::POSTS, post_id).await?;
    tracing::info!(post_id = %post_id, owner_id = %user_id, "post deleted");
    Ok(())
}

/// A user's posts, newest first.
pub fn user_posts_query(user_id: &str) -> Query {
    Query::collection(collections::POSTS)
        .where_eq("ownerId", user_id)
        .order_by("createdAt", Direction::Descending)
}

pub async fn list_user_posts(store: &dyn DocumentStore, user_id: &str) -> AppResult<Vec<Post>> {
    Ok(store.query_as_lossy(&user_posts_query(user_id)).await?)
}

// --- Interactions ---

pub async fn toggle_like(store: &dyn DocumentStore, user_id: &str, post_id: &str) -> AppResult<Post> {
    let post = load(store, post_id).await?;
    let Toggled { value, liked } = thread::toggle_post_like(&post, user_id);
    let updated = write_field(store, post_id, "likes", value).await?;

    if liked {
        notification_service::notify(store, NotificationKind::PostLike, user_id, &post.owner_id, Some(post_id))
            .await;
    }
    Ok(updated)
}

pub async fn add_comment(store: &dyn DocumentStore, user_id: &str, post_id: &str, text: &str) -> AppResult<Post> {
    let post = load(store, post_id).await?;
    let comments = thread::add_comment(&post, user_id, text)?;
    let updated = write_field(store, post_id, "comments", comments).await?;

    notification_service::notify(store, NotificationKind::NewComment, user_id, &post.owner_id, Some(post_id)).await;
    Ok(updated)
}

pub async fn edit_comment(
    store: &dyn DocumentStore,
    user_id: &str,
    post_id: &str,
    comment_id: &str,
    text: &str,
) -> AppResult<Post> {
    let post = load(store, post_id).await?;
    let comments = thread::edit_comment(&post, comment_id, user_id, text)?;
    write_field(store, post_id, "comments", comments).await
}

pub async fn delete_comment(
    store: &dyn DocumentStore,
    user_id: &str,
    post_id: &str,
    comment_id: &str,
) -> AppResult<Post> {
    let post = load(store, post_id).await?;
    let comments = thread::delete_comment(&post, comment_id, user_id)?;
    write_field(store, post_id, "comments", comments).await
}

pub async fn toggle_comment_like(
    store: &dyn DocumentStore,
    user_id: &str,
    post_id: &str,
    comment_id: &str,
) -> AppResult<Post> {
    let post = load(store, post_id).await?;
    let Toggled { value, liked } = thread::toggle_comment_like(&post, comment_id, user_id)?;
    let updated = write_field(store, post_id, "comments", value).await?;

    if liked {
        if let Some(author) = post.comment(comment_id).map(|c| c.user_id.as_str()) {
            notification_service::notify(store, NotificationKind::CommentLike, user_id, author, Some(post_id)).await;
        }
    }
    Ok(updated)
}

pub async fn add_reply(
    store: &dyn DocumentStore,
    user_id: &str,
    post_id: &str,
    comment_id: &str,
    text: &str,
) -> AppResult<Post> {
    let post = load(store, post_id).await?;
    let comments = thread::add_reply(&post, comment_id, user_id, text)?;
    write_field(store, post_id, "comments", comments).await
}

pub async fn edit_reply(
    store: &dyn DocumentStore,
    user_id: &str,
    post_id: &str,
    comment_id: &str,
    reply_id: &str,
    text: &str,
) -> AppResult<Post> {
    let post = load(store, post_id).await?;
    let comments = thread::edit_reply(&post, comment_id, reply_id, user_id, text)?;
    write_field(store, post_id, "comments", comments).await
}

pub async fn delete_reply(
    store: &dyn DocumentStore,
    user_id: &str,
    post_id: &str,
    comment_id: &str,
    reply_id: &str,
) -> AppResult<Post> {
    let post = load(store, post_id).await?;
    let comments = thread::delete_reply(&post, comment_id, reply_id, user_id)?;
    write_field(store, post_id, "comments", comments).await
}

pub async fn toggle_reply_like(
    store: &dyn DocumentStore,
    user_id: &str,
    post_id: &str,
    comment_id: &str,
    reply_id: &str,
) -> AppResult<Post> {
    let post = load(store, post_id).await?;
    let Toggled { value, .. } = thread::toggle_reply_like(&post, comment_id, reply_id, user_id)?;
    write_field(store, post_id, "comments", value).await
}

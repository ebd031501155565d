use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PostLike,
    CommentLike,
    NewComment,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostLike => "post_like",
            Self::CommentLike => "comment_like",
            Self::NewComment => "new_comment",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::PostLike => "liked your post",
            Self::CommentLike => "liked your comment",
            Self::NewComment => "commented on your post",
        }
    }
}

/// A `notifications/{id}` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    pub to_user_id: String,
    pub from_user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        from_user_id: impl Into<String>,
        to_user_id: impl Into<String>,
        post_id: Option<String>,
    ) -> Self {
        Self {
            id: String::new(),
            to_user_id: to_user_id.into(),
            from_user_id: from_user_id.into(),
            kind,
            post_id,
            message: kind.message().to_string(),
            read: false,
            created_at: Utc::now(),
        }
    }
}

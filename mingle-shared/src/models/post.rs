use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Posts with more combined likes and comments than this are trending.
pub const TRENDING_THRESHOLD: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl MediaType {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if content_type.starts_with("image/") {
            Some(Self::Image)
        } else if content_type.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Post {
    pub id: String,
    pub owner_id: String,
    pub media_type: MediaType,
    pub media_uri: String,
    pub tags: Vec<String>,
    pub description: String,
    pub likes: Vec<String>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            id: String::new(),
            owner_id: String::new(),
            media_type: MediaType::default(),
            media_uri: String::new(),
            tags: Vec::new(),
            description: String::new(),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

impl Post {
    pub fn engagement(&self) -> usize {
        self.likes.len() + self.comments.len()
    }

    pub fn is_trending(&self) -> bool {
        self.engagement() > TRENDING_THRESHOLD
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub likes: Vec<String>,
    pub replies: Vec<Reply>,
    pub created_at: DateTime<Utc>,
}

impl Default for Comment {
    fn default() -> Self {
        Self {
            id: String::new(),
            user_id: String::new(),
            text: String::new(),
            likes: Vec::new(),
            replies: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reply {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Default for Reply {
    fn default() -> Self {
        Self {
            id: String::new(),
            user_id: String::new(),
            text: String::new(),
            likes: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trending_needs_more_than_twenty_interactions() {
        let mut post = Post {
            likes: (0..20).map(|i| format!("u{i}")).collect(),
            ..Post::default()
        };
        assert!(!post.is_trending());
        post.comments.push(Comment::default());
        assert!(post.is_trending());
    }

    #[test]
    fn decodes_post_without_thread_fields() {
        let post: Post = serde_json::from_value(json!({
            "ownerId": "u1",
            "mediaType": "video",
            "mediaUri": "https://cdn/x.mp4",
            "createdAt": "2024-03-01T10:00:00Z",
        }))
        .unwrap();
        assert_eq!(post.media_type, MediaType::Video);
        assert!(post.likes.is_empty());
        assert!(post.comments.is_empty());
        assert_eq!(post.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn media_type_from_content_type() {
        assert_eq!(MediaType::from_content_type("image/png"), Some(MediaType::Image));
        assert_eq!(MediaType::from_content_type("video/mp4"), Some(MediaType::Video));
        assert_eq!(MediaType::from_content_type("text/plain"), None);
    }
}

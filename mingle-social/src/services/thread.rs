//! Pure derivations for post likes and the nested comment/reply thread.
//!
//! Each function takes the current post and returns the new value of the
//! field to write back (`likes` or `comments`). Nothing here touches the
//! store. Authorization and input failures (`NotAuthor`, `CommentNotFound`,
//! `ReplyNotFound`, `EmptyText`) return an error before any value is
//! derived, so the caller writes nothing.

use chrono::Utc;
use uuid::Uuid;

use mingle_shared::models::{Comment, Post, Reply};
use mingle_shared::{AppError, AppResult, ErrorCode};

/// New like list plus whether the user now likes the item.
#[derive(Debug, Clone, PartialEq)]
pub struct Toggled<T> {
    pub value: T,
    pub liked: bool,
}

fn toggle(likes: &[String], user: &str) -> (Vec<String>, bool) {
    if likes.iter().any(|l| l == user) {
        (likes.iter().filter(|l| *l != user).cloned().collect(), false)
    } else {
        let mut next = likes.to_vec();
        next.push(user.to_string());
        (next, true)
    }
}

fn non_blank(text: &str) -> AppResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyText, "text must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn comment_index(post: &Post, comment_id: &str) -> AppResult<usize> {
    post.comments
        .iter()
        .position(|c| c.id == comment_id)
        .ok_or_else(|| AppError::new(ErrorCode::CommentNotFound, "comment not found"))
}

fn reply_index(comment: &Comment, reply_id: &str) -> AppResult<usize> {
    comment
        .replies
        .iter()
        .position(|r| r.id == reply_id)
        .ok_or_else(|| AppError::new(ErrorCode::ReplyNotFound, "reply not found"))
}

fn not_author() -> AppError {
    AppError::new(ErrorCode::NotAuthor, "only the author can change this")
}

fn new_id() -> String {
    Uuid::now_v7().simple().to_string()
}

pub fn toggle_post_like(post: &Post, user: &str) -> Toggled<Vec<String>> {
    let (value, liked) = toggle(&post.likes, user);
    Toggled { value, liked }
}

pub fn add_comment(post: &Post, user: &str, text: &str) -> AppResult<Vec<Comment>> {
    let text = non_blank(text)?;
    let mut comments = post.comments.clone();
    comments.push(Comment {
        id: new_id(),
        user_id: user.to_string(),
        text,
        likes: Vec::new(),
        replies: Vec::new(),
        created_at: Utc::now(),
    });
    Ok(comments)
}

pub fn edit_comment(post: &Post, comment_id: &str, user: &str, text: &str) -> AppResult<Vec<Comment>> {
    let idx = comment_index(post, comment_id)?;
    if post.comments[idx].user_id != user {
        return Err(not_author());
    }
    let text = non_blank(text)?;
    let mut comments = post.comments.clone();
    comments[idx].text = text;
    Ok(comments)
}

/// The comment author or the post owner may delete a comment.
pub fn delete_comment(post: &Post, comment_id: &str, user: &str) -> AppResult<Vec<Comment>> {
    let idx = comment_index(post, comment_id)?;
    if post.comments[idx].user_id != user && post.owner_id != user {
        return Err(AppError::new(
            ErrorCode::NotAuthor,
            "only the comment author or the post owner can delete a comment",
        ));
    }
    let mut comments = post.comments.clone();
    comments.remove(idx);
    Ok(comments)
}

pub fn toggle_comment_like(post: &Post, comment_id: &str, user: &str) -> AppResult<Toggled<Vec<Comment>>> {
    let idx = comment_index(post, comment_id)?;
    let mut comments = post.comments.clone();
    let (likes, liked) = toggle(&comments[idx].likes, user);
    comments[idx].likes = likes;
    Ok(Toggled { value: comments, liked })
}

pub fn add_reply(post: &Post, comment_id: &str, user: &str, text: &str) -> AppResult<Vec<Comment>> {
    let idx = comment_index(post, comment_id)?;
    let text = non_blank(text)?;
    let mut comments = post.comments.clone();
    comments[idx].replies.push(Reply {
        id: new_id(),
        user_id: user.to_string(),
        text,
        likes: Vec::new(),
        created_at: Utc::now(),
    });
    Ok(comments)
}

pub fn edit_reply(
    post: &Post,
    comment_id: &str,
    reply_id: &str,
    user: &str,
    text: &str,
) -> AppResult<Vec<Comment>> {
    let c = comment_index(post, comment_id)?;
    let r = reply_index(&post.comments[c], reply_id)?;
    if post.comments[c].replies[r].user_id != user {
        return Err(not_author());
    }
    let text = non_blank(text)?;
    let mut comments = post.comments.clone();
    comments[c].replies[r].text = text;
    Ok(comments)
}

/// Only the reply author may delete a reply.
pub fn delete_reply(post: &Post, comment_id: &str, reply_id: &str, user: &str) -> AppResult<Vec<Comment>> {
    let c = comment_index(post, comment_id)?;
    let r = reply_index(&post.comments[c], reply_id)?;
    if post.comments[c].replies[r].user_id != user {
        return Err(not_author());
    }
    let mut comments = post.comments.clone();
    comments[c].replies.remove(r);
    Ok(comments)
}

pub fn toggle_reply_like(
    post: &Post,
    comment_id: &str,
    reply_id: &str,
    user: &str,
) -> AppResult<Toggled<Vec<Comment>>> {
    let c = comment_index(post, comment_id)?;
    let r = reply_index(&post.comments[c], reply_id)?;
    let mut comments = post.comments.clone();
    let (likes, liked) = toggle(&comments[c].replies[r].likes, user);
    comments[c].replies[r].likes = likes;
    Ok(Toggled { value: comments, liked })
}

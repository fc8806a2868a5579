use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author: UserSummary,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Result of a like toggle: the caller's resulting state and the post's
/// counter as committed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentWithCount {
    pub comment: Comment,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostComments {
    pub post_id: Uuid,
    pub comments: Vec<Comment>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostLikes {
    pub post_id: Uuid,
    pub users: Vec<UserSummary>,
    pub like_count: i64,
}

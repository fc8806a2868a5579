use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::UserSummary;

/// Decorated post projection. Every read path returns this shape; the
/// counters are the stored denormalized values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author: UserSummary,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Rows removed by a cascading post delete.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PostDeletion {
    pub deleted_likes: u64,
    pub deleted_comments: u64,
}

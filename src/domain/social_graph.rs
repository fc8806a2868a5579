use std::collections::HashSet;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::UserSummary;

#[derive(Debug, Clone, Serialize)]
pub struct FollowEdge {
    pub user: UserSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub followed_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Relationship {
    pub is_following: bool,
    pub is_followed_by: bool,
    pub is_mutual: bool,
}

impl Relationship {
    pub fn new(is_following: bool, is_followed_by: bool) -> Self {
        Self {
            is_following,
            is_followed_by,
            is_mutual: is_following && is_followed_by,
        }
    }
}

/// Mutual follows of `viewer` plus the viewer, sorted.
pub fn feed_authors(viewer: Uuid, following: &[Uuid], followers: &[Uuid]) -> Vec<Uuid> {
    let followers: HashSet<Uuid> = followers.iter().copied().collect();
    let mut authors: Vec<Uuid> = following
        .iter()
        .copied()
        .filter(|id| *id != viewer && followers.contains(id))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    authors.push(viewer);
    authors.sort();
    authors
}

use sqlx::Row;
use uuid::Uuid;

use crate::app::error::missing_user;
use crate::app::users::summary_from_row;
use crate::app::{Page, Paged, ServiceError, ServiceResult};
use crate::domain::social_graph::{FollowEdge, Relationship};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

/// Which end of the follow edge a listing walks.
#[derive(Debug, Clone, Copy)]
enum Direction {
    Followers,
    Following,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn follow_user(&self, follower_id: Uuid, target_id: Uuid) -> ServiceResult<()> {
        if follower_id == target_id {
            return Err(ServiceError::invalid("cannot follow yourself"));
        }

        let target_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(target_id)
                .fetch_one(self.db.pool())
                .await?;
        if !target_exists {
            return Err(ServiceError::NotFound("user"));
        }

        // The unique (follower_id, following_id) constraint arbitrates
        // concurrent follows of the same pair.
        let result = sqlx::query(
            "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) \
             ON CONFLICT (follower_id, following_id) DO NOTHING",
        )
        .bind(follower_id)
        .bind(target_id)
        .execute(self.db.pool())
        .await
        .map_err(missing_user)?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::Conflict("already following this user"));
        }

        Ok(())
    }

    pub async fn unfollow_user(&self, follower_id: Uuid, target_id: Uuid) -> ServiceResult<()> {
        if follower_id == target_id {
            return Err(ServiceError::invalid("cannot unfollow yourself"));
        }

        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower_id)
                .bind(target_id)
                .execute(self.db.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("follow"));
        }

        Ok(())
    }

    pub async fn list_followers(&self, user_id: Uuid, page: Page) -> ServiceResult<Paged<FollowEdge>> {
        self.list_edges(user_id, Direction::Followers, page).await
    }

    pub async fn list_following(&self, user_id: Uuid, page: Page) -> ServiceResult<Paged<FollowEdge>> {
        self.list_edges(user_id, Direction::Following, page).await
    }

    async fn list_edges(
        &self,
        user_id: Uuid,
        direction: Direction,
        page: Page,
    ) -> ServiceResult<Paged<FollowEdge>> {
        let (anchor, other) = match direction {
            Direction::Followers => ("following_id", "follower_id"),
            Direction::Following => ("follower_id", "following_id"),
        };
        let sql = format!(
            "SELECT u.id, u.username, u.name, u.profile_picture_ref, f.created_at AS followed_at \
             FROM follows f \
             JOIN users u ON u.id = f.{other} \
             WHERE f.{anchor} = $1 \
               AND ($2::timestamptz IS NULL OR (f.created_at, f.{other}) < ($2, $3)) \
             ORDER BY f.created_at DESC, f.{other} DESC \
             LIMIT $4",
            anchor = anchor,
            other = other,
        );

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(page.cursor_time())
            .bind(page.cursor_id())
            .bind(page.fetch_limit())
            .fetch_all(self.db.pool())
            .await?;

        let edges = rows
            .iter()
            .map(|row| FollowEdge {
                user: summary_from_row(row, ""),
                followed_at: row.get("followed_at"),
            })
            .collect();

        Ok(Paged::from_fetched(edges, &page, |edge| {
            (edge.followed_at, edge.user.id)
        }))
    }

    pub async fn following_ids(&self, user_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT following_id FROM follows WHERE follower_id = $1")
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(ids)
    }

    pub async fn follower_ids(&self, user_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT follower_id FROM follows WHERE following_id = $1")
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(ids)
    }

    pub async fn relationship(&self, viewer_id: Uuid, other_id: Uuid) -> ServiceResult<Relationship> {
        if viewer_id == other_id {
            return Ok(Relationship::new(false, false));
        }

        let row = sqlx::query(
            "SELECT \
                EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2) AS is_following, \
                EXISTS (SELECT 1 FROM follows WHERE follower_id = $2 AND following_id = $1) AS is_followed_by",
        )
        .bind(viewer_id)
        .bind(other_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Relationship::new(
            row.get("is_following"),
            row.get("is_followed_by"),
        ))
    }
}

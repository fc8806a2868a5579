use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::app::error::missing_user;
use crate::app::users::summary_from_row;
use crate::app::{ServiceError, ServiceResult};
use crate::domain::content::{normalize_text, MAX_COMMENT_CHARS};
use crate::domain::engagement::{Comment, CommentWithCount, LikeToggle, PostComments, PostLikes};
use crate::infra::db::Db;

/// Decorated comment columns; `c` is comments, `u` is the author.
const COMMENT_COLUMNS: &str = "c.id, c.post_id, c.content, c.created_at, c.updated_at, \
     u.id AS author_id, u.username AS author_username, u.name AS author_name, \
     u.profile_picture_ref AS author_profile_picture_ref";

fn comment_from_row(row: &PgRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author: summary_from_row(row, "author_"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> ServiceResult<LikeToggle> {
        let mut tx = self.db.pool().begin().await?;

        if !lock_post(&mut tx, post_id).await? {
            tx.rollback().await?;
            return Err(ServiceError::NotFound("post"));
        }

        let removed = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if !removed {
            sqlx::query("INSERT INTO likes (post_id, user_id) VALUES ($1, $2)")
                .bind(post_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(missing_user)?;
        }

        let like_count = refresh_like_count(&mut tx, post_id).await?;
        tx.commit().await?;

        Ok(LikeToggle {
            liked: !removed,
            like_count,
        })
    }

    pub async fn add_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> ServiceResult<CommentWithCount> {
        let content = normalize_text(content, "content", MAX_COMMENT_CHARS).map_err(ServiceError::invalid)?;

        let mut tx = self.db.pool().begin().await?;

        if !lock_post(&mut tx, post_id).await? {
            tx.rollback().await?;
            return Err(ServiceError::NotFound("post"));
        }

        let sql = format!(
            "WITH c AS ( \
                INSERT INTO comments (post_id, author_id, content) \
                VALUES ($1, $2, $3) \
                RETURNING * \
             ) \
             SELECT {} FROM c JOIN users u ON u.id = c.author_id",
            COMMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(post_id)
            .bind(user_id)
            .bind(content)
            .fetch_one(&mut *tx)
            .await
            .map_err(missing_user)?;
        let comment = comment_from_row(&row);

        let comment_count = refresh_comment_count(&mut tx, post_id).await?;
        tx.commit().await?;

        Ok(CommentWithCount {
            comment,
            comment_count,
        })
    }

    pub async fn update_comment(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> ServiceResult<CommentWithCount> {
        let content = normalize_text(content, "content", MAX_COMMENT_CHARS).map_err(ServiceError::invalid)?;

        let mut tx = self.db.pool().begin().await?;

        let author_id: Option<Uuid> =
            sqlx::query_scalar("SELECT author_id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(comment_id)
                .fetch_optional(&mut *tx)
                .await?;
        match author_id {
            Some(author_id) if author_id == user_id => {}
            Some(_) => {
                tx.rollback().await?;
                return Err(ServiceError::Forbidden("only the author can edit this comment"));
            }
            None => {
                tx.rollback().await?;
                return Err(ServiceError::NotFound("comment"));
            }
        }

        let sql = format!(
            "WITH c AS ( \
                UPDATE comments SET content = $2, updated_at = clock_timestamp() \
                WHERE id = $1 \
                RETURNING * \
             ) \
             SELECT {}, p.comment_count \
             FROM c \
             JOIN users u ON u.id = c.author_id \
             JOIN posts p ON p.id = c.post_id",
            COMMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(comment_id)
            .bind(content)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CommentWithCount {
            comment: comment_from_row(&row),
            comment_count: row.get("comment_count"),
        })
    }

    pub async fn delete_comment(&self, comment_id: Uuid, user_id: Uuid) -> ServiceResult<i64> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query("SELECT post_id, author_id FROM comments WHERE id = $1")
            .bind(comment_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Err(ServiceError::NotFound("comment"));
        };
        let post_id: Uuid = row.get("post_id");
        let author_id: Uuid = row.get("author_id");

        if author_id != user_id {
            tx.rollback().await?;
            return Err(ServiceError::Forbidden("only the author can delete this comment"));
        }

        if !lock_post(&mut tx, post_id).await? {
            tx.rollback().await?;
            return Err(ServiceError::NotFound("post"));
        }

        // A concurrent delete of the same comment may have won the race
        // while this transaction waited on the post lock.
        let deleted = sqlx::query("DELETE FROM comments WHERE id = $1 AND author_id = $2")
            .bind(comment_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Err(ServiceError::NotFound("comment"));
        }

        let comment_count = refresh_comment_count(&mut tx, post_id).await?;
        tx.commit().await?;

        Ok(comment_count)
    }

    pub async fn list_comments(&self, post_id: Uuid) -> ServiceResult<PostComments> {
        let comment_count: i64 =
            sqlx::query_scalar("SELECT comment_count FROM posts WHERE id = $1")
                .bind(post_id)
                .fetch_optional(self.db.pool())
                .await?
                .ok_or(ServiceError::NotFound("post"))?;

        let sql = format!(
            "SELECT {} \
             FROM comments c \
             JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at DESC, c.id DESC",
            COMMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(post_id)
            .fetch_all(self.db.pool())
            .await?;

        Ok(PostComments {
            post_id,
            comments: rows.iter().map(comment_from_row).collect(),
            comment_count,
        })
    }

    pub async fn list_likes(&self, post_id: Uuid) -> ServiceResult<PostLikes> {
        let like_count: i64 = sqlx::query_scalar("SELECT like_count FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ServiceError::NotFound("post"))?;

        let rows = sqlx::query(
            "SELECT u.id, u.username, u.name, u.profile_picture_ref \
             FROM likes l \
             JOIN users u ON u.id = l.user_id \
             WHERE l.post_id = $1 \
             ORDER BY l.created_at DESC, l.id DESC",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(PostLikes {
            post_id,
            users: rows.iter().map(|row| summary_from_row(row, "")).collect(),
            like_count,
        })
    }

    pub async fn reconcile_counters(&self) -> ServiceResult<u64> {
        let drifted: Vec<Uuid> = sqlx::query_scalar(
            "SELECT p.id FROM posts p \
             WHERE p.like_count <> (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) \
                OR p.comment_count <> (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id)",
        )
        .fetch_all(self.db.pool())
        .await?;

        let mut corrected = 0;
        for post_id in drifted {
            let mut tx = self.db.pool().begin().await?;
            if !lock_post(&mut tx, post_id).await? {
                // Deleted since the scan.
                tx.rollback().await?;
                continue;
            }
            let like_count = refresh_like_count(&mut tx, post_id).await?;
            let comment_count = refresh_comment_count(&mut tx, post_id).await?;
            tx.commit().await?;

            tracing::info!(post_id = %post_id, like_count, comment_count, "post counters reconciled");
            corrected += 1;
        }

        Ok(corrected)
    }
}

/// Takes the row lock every counter write serializes on. `false` when the
/// post does not exist.
async fn lock_post(tx: &mut Transaction<'_, Postgres>, post_id: Uuid) -> Result<bool, sqlx::Error> {
    let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
        .bind(post_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(locked.is_some())
}

async fn refresh_like_count(tx: &mut Transaction<'_, Postgres>, post_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE posts \
         SET like_count = (SELECT COUNT(*) FROM likes WHERE post_id = $1) \
         WHERE id = $1 \
         RETURNING like_count",
    )
    .bind(post_id)
    .fetch_one(&mut **tx)
    .await
}

async fn refresh_comment_count(
    tx: &mut Transaction<'_, Postgres>,
    post_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE posts \
         SET comment_count = (SELECT COUNT(*) FROM comments WHERE post_id = $1) \
         WHERE id = $1 \
         RETURNING comment_count",
    )
    .bind(post_id)
    .fetch_one(&mut **tx)
    .await
}

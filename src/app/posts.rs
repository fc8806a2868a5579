use uuid::Uuid;

use crate::app::error::missing_user;
use crate::app::feed::{post_from_row, POST_COLUMNS};
use crate::app::{ServiceError, ServiceResult};
use crate::domain::content::{normalize_ref, normalize_text, MAX_POST_CHARS};
use crate::domain::post::{Post, PostDeletion};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        content: &str,
        image_ref: Option<String>,
    ) -> ServiceResult<Post> {
        let content = normalize_text(content, "content", MAX_POST_CHARS).map_err(ServiceError::invalid)?;
        let image_ref = normalize_ref(image_ref);

        let sql = format!(
            "WITH p AS ( \
                INSERT INTO posts (author_id, content, image_ref) \
                VALUES ($1, $2, $3) \
                RETURNING * \
             ) \
             SELECT {} FROM p JOIN users u ON u.id = p.author_id",
            POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(author_id)
            .bind(content)
            .bind(image_ref)
            .fetch_one(self.db.pool())
            .await
            .map_err(missing_user)?;

        Ok(post_from_row(&row))
    }

    pub async fn update_post(&self, post_id: Uuid, user_id: Uuid, content: &str) -> ServiceResult<Post> {
        let content = normalize_text(content, "content", MAX_POST_CHARS).map_err(ServiceError::invalid)?;

        let mut tx = self.db.pool().begin().await?;

        let author_id: Option<Uuid> =
            sqlx::query_scalar("SELECT author_id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
        match author_id {
            Some(author_id) if author_id == user_id => {}
            Some(_) => {
                tx.rollback().await?;
                return Err(ServiceError::Forbidden("only the author can edit this post"));
            }
            None => {
                tx.rollback().await?;
                return Err(ServiceError::NotFound("post"));
            }
        }

        let sql = format!(
            "WITH p AS ( \
                UPDATE posts SET content = $2, updated_at = clock_timestamp() \
                WHERE id = $1 \
                RETURNING * \
             ) \
             SELECT {} FROM p JOIN users u ON u.id = p.author_id",
            POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(post_id)
            .bind(content)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(post_from_row(&row))
    }

    pub async fn delete_post(&self, post_id: Uuid, user_id: Uuid) -> ServiceResult<PostDeletion> {
        let mut tx = self.db.pool().begin().await?;

        let author_id: Option<Uuid> =
            sqlx::query_scalar("SELECT author_id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
        match author_id {
            Some(author_id) if author_id == user_id => {}
            Some(_) => {
                tx.rollback().await?;
                return Err(ServiceError::Forbidden("only the author can delete this post"));
            }
            None => {
                tx.rollback().await?;
                return Err(ServiceError::NotFound("post"));
            }
        }

        let deleted_likes = sqlx::query("DELETE FROM likes WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let deleted_comments = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            post_id = %post_id,
            deleted_likes,
            deleted_comments,
            "post deleted"
        );

        Ok(PostDeletion {
            deleted_likes,
            deleted_comments,
        })
    }
}

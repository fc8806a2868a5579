use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::app::social::SocialService;
use crate::app::users::summary_from_row;
use crate::app::{Page, Paged, ServiceError, ServiceResult};
use crate::domain::post::Post;
use crate::domain::social_graph::feed_authors;
use crate::infra::db::Db;

pub(crate) const POST_COLUMNS: &str = "p.id, p.content, p.image_ref, p.like_count, p.comment_count, \
     p.created_at, p.updated_at, \
     u.id AS author_id, u.username AS author_username, u.name AS author_name, \
     u.profile_picture_ref AS author_profile_picture_ref";

pub(crate) fn post_from_row(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        author: summary_from_row(row, "author_"),
        content: row.get("content"),
        image_ref: row.get("image_ref"),
        image_url: None,
        like_count: row.get("like_count"),
        comment_count: row.get("comment_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[derive(Clone)]
pub struct FeedService {
    db: Db,
    social: SocialService,
}

impl FeedService {
    pub fn new(db: Db) -> Self {
        let social = SocialService::new(db.clone());
        Self { db, social }
    }

    pub async fn get_feed(&self, user_id: Uuid, page: Page) -> ServiceResult<Paged<Post>> {
        let following = self.social.following_ids(user_id).await?;
        let followers = self.social.follower_ids(user_id).await?;
        let authors = feed_authors(user_id, &following, &followers);

        tracing::debug!(user_id = %user_id, authors = authors.len(), "assembling feed");

        self.posts_by_authors(&authors, page).await
    }

    pub async fn get_user_posts(&self, user_id: Uuid, page: Page) -> ServiceResult<Paged<Post>> {
        self.posts_by_authors(&[user_id], page).await
    }

    pub async fn get_post(&self, post_id: Uuid) -> ServiceResult<Post> {
        let sql = format!(
            "SELECT {} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.id = $1",
            POST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(ServiceError::NotFound("post"))?;

        Ok(post_from_row(&row))
    }

    async fn posts_by_authors(&self, authors: &[Uuid], page: Page) -> ServiceResult<Paged<Post>> {
        let sql = format!(
            "SELECT {} \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             WHERE p.author_id = ANY($1) \
               AND ($2::timestamptz IS NULL OR (p.created_at, p.id) < ($2, $3)) \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $4",
            POST_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(authors.to_vec())
            .bind(page.cursor_time())
            .bind(page.cursor_id())
            .bind(page.fetch_limit())
            .fetch_all(self.db.pool())
            .await?;

        let posts = rows.iter().map(post_from_row).collect();
        Ok(Paged::from_fetched(posts, &page, |post: &Post| {
            (post.created_at, post.id)
        }))
    }
}

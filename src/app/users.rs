use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::app::{Page, Paged, ServiceError, ServiceResult};
use crate::domain::content::{
    escape_like_pattern, normalize_ref, normalize_text, MAX_BIO_CHARS, MAX_NAME_CHARS,
    MAX_SEARCH_CHARS,
};
use crate::domain::user::{ProfileUpdate, UserListing, UserProfile, UserSummary};
use crate::infra::db::Db;

/// Reads a user summary from columns named `{prefix}id`, `{prefix}username`,
/// `{prefix}name` and `{prefix}profile_picture_ref`.
pub(crate) fn summary_from_row(row: &PgRow, prefix: &str) -> UserSummary {
    UserSummary {
        id: row.get(format!("{}id", prefix).as_str()),
        username: row.get(format!("{}username", prefix).as_str()),
        name: row.get(format!("{}name", prefix).as_str()),
        profile_picture_ref: row.get(format!("{}profile_picture_ref", prefix).as_str()),
        profile_picture_url: None,
    }
}

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> ServiceResult<UserProfile> {
        let row = sqlx::query(
            "SELECT u.id, u.username, u.name, u.profile_picture_ref, u.bio, u.created_at, \
                    (SELECT COUNT(*) FROM follows WHERE following_id = u.id) AS followers_count, \
                    (SELECT COUNT(*) FROM follows WHERE follower_id = u.id) AS following_count, \
                    (SELECT COUNT(*) FROM posts WHERE author_id = u.id) AS posts_count \
             FROM users u WHERE u.id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or(ServiceError::NotFound("user"))?;

        Ok(UserProfile {
            summary: summary_from_row(&row, ""),
            bio: row.get("bio"),
            created_at: row.get("created_at"),
            followers_count: row.get("followers_count"),
            following_count: row.get("following_count"),
            posts_count: row.get("posts_count"),
        })
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        requesting_user_id: Uuid,
        update: ProfileUpdate,
    ) -> ServiceResult<UserProfile> {
        if user_id != requesting_user_id {
            return Err(ServiceError::Forbidden("cannot update other users"));
        }

        let name = update
            .name
            .as_deref()
            .map(|name| normalize_text(name, "name", MAX_NAME_CHARS))
            .transpose()
            .map_err(ServiceError::invalid)?;
        let bio = match update.bio {
            Some(bio) if bio.trim().is_empty() => Some(String::new()),
            Some(bio) => Some(normalize_text(&bio, "bio", MAX_BIO_CHARS).map_err(ServiceError::invalid)?),
            None => None,
        };
        let picture = normalize_ref(update.profile_picture_ref);

        let updated = sqlx::query(
            "UPDATE users \
             SET name = COALESCE($2, name), \
                 bio = CASE WHEN $3::text IS NULL THEN bio ELSE NULLIF($3, '') END, \
                 profile_picture_ref = COALESCE($4, profile_picture_ref), \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(name)
        .bind(bio)
        .bind(picture)
        .execute(self.db.pool())
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ServiceError::NotFound("user"));
        }

        self.get_profile(user_id).await
    }

    pub async fn list_users(&self, viewer_id: Uuid, page: Page) -> ServiceResult<Paged<UserListing>> {
        self.directory(viewer_id, Some(viewer_id), None, page).await
    }

    pub async fn search_users(
        &self,
        viewer_id: Uuid,
        query: &str,
        page: Page,
    ) -> ServiceResult<Paged<UserListing>> {
        let term = normalize_text(query, "q", MAX_SEARCH_CHARS).map_err(ServiceError::invalid)?;
        let pattern = format!("%{}%", escape_like_pattern(&term));

        self.directory(viewer_id, None, Some(pattern), page).await
    }

    async fn directory(
        &self,
        viewer_id: Uuid,
        exclude: Option<Uuid>,
        pattern: Option<String>,
        page: Page,
    ) -> ServiceResult<Paged<UserListing>> {
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.name, u.profile_picture_ref, u.created_at, \
                    EXISTS ( \
                        SELECT 1 FROM follows f \
                        WHERE f.follower_id = $1 AND f.following_id = u.id \
                    ) AS is_following \
             FROM users u \
             WHERE ($2::uuid IS NULL OR u.id <> $2) \
               AND ($3::text IS NULL \
                    OR u.username ILIKE $3 ESCAPE '\\' \
                    OR u.name ILIKE $3 ESCAPE '\\') \
               AND ($4::timestamptz IS NULL OR (u.created_at, u.id) < ($4, $5)) \
             ORDER BY u.created_at DESC, u.id DESC \
             LIMIT $6",
        )
        .bind(viewer_id)
        .bind(exclude)
        .bind(pattern)
        .bind(page.cursor_time())
        .bind(page.cursor_id())
        .bind(page.fetch_limit())
        .fetch_all(self.db.pool())
        .await?;

        let users = rows
            .iter()
            .map(|row| UserListing {
                summary: summary_from_row(row, ""),
                is_following: row.get("is_following"),
                created_at: row.get("created_at"),
            })
            .collect();

        Ok(Paged::from_fetched(users, &page, |user: &UserListing| {
            (user.created_at, user.summary.id)
        }))
    }
}

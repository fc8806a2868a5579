use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::engagement::EngagementService;
use crate::app::feed::FeedService;
use crate::app::posts::PostService;
use crate::app::social::SocialService;
use crate::app::users::UserService;
use crate::app::{Cursor, Page, Paged};
use crate::domain::engagement::{CommentWithCount, LikeToggle, PostComments, PostLikes};
use crate::domain::post::{Post, PostDeletion};
use crate::domain::social_graph::{FollowEdge, Relationship};
use crate::domain::user::{ProfileUpdate, UserListing, UserProfile};
use crate::http::{AppError, AuthUser};
use crate::AppState;

const DEFAULT_DIRECTORY_LIMIT: i64 = 30;
const DEFAULT_SEARCH_LIMIT: i64 = 10;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> From<Paged<T>> for ListResponse<T> {
    fn from(paged: Paged<T>) -> Self {
        Self {
            items: paged.items,
            next_cursor: encode_cursor(paged.next_cursor),
        }
    }
}

fn parse_page(query: PaginationQuery) -> Result<Page, AppError> {
    let cursor = parse_cursor(query.cursor)?;
    Page::new(cursor, query.limit).map_err(|err| AppError::from_service(err, "invalid page"))
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<Cursor>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let (timestamp, id) = cursor
        .rsplit_once('/')
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<Cursor>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

pub(crate) async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.db.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "ok" })),
        Err(err) => {
            tracing::warn!(error = ?err, "database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse { status: "degraded" }),
            )
        }
    }
}

fn decorate_posts(state: &AppState, mut paged: Paged<Post>) -> Paged<Post> {
    for post in &mut paged.items {
        state.media.decorate_post(post);
    }
    paged
}

pub async fn home_feed(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let page = parse_page(query)?;

    let service = FeedService::new(state.db.clone());
    let posts = service
        .get_feed(auth.user_id, page)
        .await
        .map_err(|err| AppError::from_service(err, "failed to fetch feed"))?;

    Ok(Json(decorate_posts(&state, posts).into()))
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    pub image_ref: Option<String>,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let service = PostService::new(state.db.clone());
    let mut post = service
        .create_post(auth.user_id, &payload.content, payload.image_ref)
        .await
        .map_err(|err| AppError::from_service(err, "failed to create post"))?;

    state.media.decorate_post(&mut post);
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Post>, AppError> {
    let service = FeedService::new(state.db.clone());
    let mut post = service
        .get_post(id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to fetch post"))?;

    state.media.decorate_post(&mut post);
    Ok(Json(post))
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub content: String,
}

pub async fn update_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let service = PostService::new(state.db.clone());
    let mut post = service
        .update_post(id, auth.user_id, &payload.content)
        .await
        .map_err(|err| AppError::from_service(err, "failed to update post"))?;

    state.media.decorate_post(&mut post);
    Ok(Json(post))
}

pub async fn delete_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PostDeletion>, AppError> {
    let service = PostService::new(state.db.clone());
    let deletion = service
        .delete_post(id, auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to delete post"))?;

    Ok(Json(deletion))
}

pub async fn toggle_like(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LikeToggle>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let toggle = service
        .toggle_like(id, auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to toggle like"))?;

    Ok(Json(toggle))
}

pub async fn list_post_likes(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PostLikes>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let mut likes = service
        .list_likes(id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to list likes"))?;

    for user in &mut likes.users {
        state.media.decorate_user(user);
    }
    Ok(Json(likes))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

pub async fn add_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<CommentWithCount>), AppError> {
    let service = EngagementService::new(state.db.clone());
    let mut added = service
        .add_comment(id, auth.user_id, &payload.content)
        .await
        .map_err(|err| AppError::from_service(err, "failed to add comment"))?;

    state.media.decorate_comment(&mut added.comment);
    Ok((StatusCode::CREATED, Json(added)))
}

pub async fn list_post_comments(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PostComments>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let mut comments = service
        .list_comments(id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to list comments"))?;

    for comment in &mut comments.comments {
        state.media.decorate_comment(comment);
    }
    Ok(Json(comments))
}

pub async fn update_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<CommentWithCount>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let mut updated = service
        .update_comment(id, auth.user_id, &payload.content)
        .await
        .map_err(|err| AppError::from_service(err, "failed to update comment"))?;

    state.media.decorate_comment(&mut updated.comment);
    Ok(Json(updated))
}

#[derive(Serialize)]
pub struct CommentDeletedResponse {
    pub comment_count: i64,
}

pub async fn delete_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CommentDeletedResponse>, AppError> {
    let service = EngagementService::new(state.db.clone());
    let comment_count = service
        .delete_comment(id, auth.user_id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to delete comment"))?;

    Ok(Json(CommentDeletedResponse { comment_count }))
}

pub async fn get_profile(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, AppError> {
    let service = UserService::new(state.db.clone());
    let mut profile = service
        .get_profile(id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to fetch user"))?;

    state.media.decorate_user(&mut profile.summary);
    Ok(Json(profile))
}

pub async fn update_profile(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    let service = UserService::new(state.db.clone());
    let mut profile = service
        .update_profile(id, auth.user_id, payload)
        .await
        .map_err(|err| AppError::from_service(err, "failed to update profile"))?;

    state.media.decorate_user(&mut profile.summary);
    Ok(Json(profile))
}

pub async fn list_user_posts(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let page = parse_page(query)?;

    let service = FeedService::new(state.db.clone());
    let posts = service
        .get_user_posts(id, page)
        .await
        .map_err(|err| AppError::from_service(err, "failed to list user posts"))?;

    Ok(Json(decorate_posts(&state, posts).into()))
}

fn decorate_listings(state: &AppState, mut paged: Paged<UserListing>) -> Paged<UserListing> {
    for listing in &mut paged.items {
        state.media.decorate_user(&mut listing.summary);
    }
    paged
}

pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<UserListing>>, AppError> {
    let page = parse_page(PaginationQuery {
        limit: query.limit.or(Some(DEFAULT_DIRECTORY_LIMIT)),
        ..query
    })?;

    let service = UserService::new(state.db.clone());
    let users = service
        .list_users(auth.user_id, page)
        .await
        .map_err(|err| AppError::from_service(err, "failed to list users"))?;

    Ok(Json(decorate_listings(&state, users).into()))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn search_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ListResponse<UserListing>>, AppError> {
    let page = parse_page(PaginationQuery {
        limit: query.limit.or(Some(DEFAULT_SEARCH_LIMIT)),
        cursor: query.cursor,
    })?;
    let term = query.q.unwrap_or_default();

    let service = UserService::new(state.db.clone());
    let users = service
        .search_users(auth.user_id, &term, page)
        .await
        .map_err(|err| AppError::from_service(err, "failed to search users"))?;

    Ok(Json(decorate_listings(&state, users).into()))
}

#[derive(Serialize)]
pub struct FollowResponse {
    pub following: bool,
}

pub async fn follow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowResponse>, AppError> {
    let service = SocialService::new(state.db.clone());
    service
        .follow_user(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to follow user"))?;

    tracing::debug!(follower_id = %auth.user_id, following_id = %id, "followed");
    Ok(Json(FollowResponse { following: true }))
}

pub async fn unfollow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowResponse>, AppError> {
    let service = SocialService::new(state.db.clone());
    service
        .unfollow_user(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to unfollow user"))?;

    tracing::debug!(follower_id = %auth.user_id, following_id = %id, "unfollowed");
    Ok(Json(FollowResponse { following: false }))
}

fn decorate_edges(state: &AppState, mut paged: Paged<FollowEdge>) -> Paged<FollowEdge> {
    for edge in &mut paged.items {
        state.media.decorate_user(&mut edge.user);
    }
    paged
}

pub async fn list_followers(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<FollowEdge>>, AppError> {
    let page = parse_page(query)?;

    let service = SocialService::new(state.db.clone());
    let followers = service
        .list_followers(id, page)
        .await
        .map_err(|err| AppError::from_service(err, "failed to list followers"))?;

    Ok(Json(decorate_edges(&state, followers).into()))
}

pub async fn list_following(
    Path(id): Path<Uuid>,
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<FollowEdge>>, AppError> {
    let page = parse_page(query)?;

    let service = SocialService::new(state.db.clone());
    let following = service
        .list_following(id, page)
        .await
        .map_err(|err| AppError::from_service(err, "failed to list following"))?;

    Ok(Json(decorate_edges(&state, following).into()))
}

pub async fn relationship(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Relationship>, AppError> {
    let service = SocialService::new(state.db.clone());
    let relationship = service
        .relationship(auth.user_id, id)
        .await
        .map_err(|err| AppError::from_service(err, "failed to fetch relationship"))?;

    Ok(Json(relationship))
}

use axum::{routing::get, routing::patch, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/feed", get(handlers::home_feed))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route(
            "/posts/:id",
            get(handlers::get_post)
                .patch(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/posts/:id/like", post(handlers::toggle_like))
        .route("/posts/:id/likes", get(handlers::list_post_likes))
        .route(
            "/posts/:id/comments",
            post(handlers::add_comment).get(handlers::list_post_comments),
        )
}

pub fn comments() -> Router<AppState> {
    Router::new().route(
        "/comments/:id",
        patch(handlers::update_comment).delete(handlers::delete_comment),
    )
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route(
            "/users/:id",
            get(handlers::get_profile).patch(handlers::update_profile),
        )
        .route("/users/:id/posts", get(handlers::list_user_posts))
        .route(
            "/users/:id/follow",
            post(handlers::follow_user).delete(handlers::unfollow_user),
        )
        .route("/users/:id/followers", get(handlers::list_followers))
        .route("/users/:id/following", get(handlers::list_following))
        .route("/users/:id/relationship", get(handlers::relationship))
}

pub fn search() -> Router<AppState> {
    Router::new().route("/search/users", get(handlers::search_users))
}

use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::AuthUser;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .nest(
            "/v1",
            Router::new()
                .merge(routes::feed())
                .merge(routes::posts())
                .merge(routes::comments())
                .merge(routes::users())
                .merge(routes::search()),
        )
        .with_state(state)
}

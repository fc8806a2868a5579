pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::app::auth::AccessTokens;
use crate::infra::{db::Db, media::MediaUrls};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub tokens: AccessTokens,
    pub media: MediaUrls,
}

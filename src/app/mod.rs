pub mod auth;
pub mod engagement;
pub mod error;
pub mod feed;
pub mod posts;
pub mod social;
pub mod users;

use time::OffsetDateTime;
use uuid::Uuid;

pub use error::{ServiceError, ServiceResult};

/// Keyset position: the `(created_at, id)` of the last item already seen.
pub type Cursor = (OffsetDateTime, Uuid);

pub const MAX_PAGE_LIMIT: i64 = 200;

/// Optional window over a newest-first listing. Without a limit the whole
/// listing is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    cursor: Option<Cursor>,
    limit: Option<i64>,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(cursor: Option<Cursor>, limit: Option<i64>) -> ServiceResult<Self> {
        if let Some(limit) = limit {
            if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
                return Err(ServiceError::invalid(format!(
                    "limit must be between 1 and {}",
                    MAX_PAGE_LIMIT
                )));
            }
        }
        Ok(Self { cursor, limit })
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    /// Row limit to ask the database for: one extra row tells whether a
    /// next page exists.
    pub(crate) fn fetch_limit(&self) -> Option<i64> {
        self.limit.map(|limit| limit + 1)
    }

    pub(crate) fn cursor_time(&self) -> Option<OffsetDateTime> {
        self.cursor.map(|(created_at, _)| created_at)
    }

    pub(crate) fn cursor_id(&self) -> Option<Uuid> {
        self.cursor.map(|(_, id)| id)
    }
}

#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T> Paged<T> {
    pub(crate) fn from_fetched(mut items: Vec<T>, page: &Page, key: impl Fn(&T) -> Cursor) -> Self {
        let next_cursor = match page.limit {
            Some(limit) if items.len() > limit as usize => {
                items.truncate(limit as usize);
                items.last().map(&key)
            }
            _ => None,
        };
        Self { items, next_cursor }
    }
}

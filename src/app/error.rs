use thiserror::Error;

/// Outcome taxonomy shared by every service operation. Everything except
/// `Storage` is an expected, caller-recoverable condition.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

const FOREIGN_KEY_VIOLATION: &str = "23503";

/// For inserts whose only unchecked reference is the acting user: a foreign
/// key violation means that user has no row.
pub(crate) fn missing_user(err: sqlx::Error) -> ServiceError {
    let is_fk_violation = err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code == FOREIGN_KEY_VIOLATION)
        .unwrap_or(false);

    if is_fk_violation {
        ServiceError::NotFound("user")
    } else {
        ServiceError::Storage(err)
    }
}

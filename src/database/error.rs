use thiserror::Error;

/// Errors surfaced by the data-access layer.
///
/// "Zero rows affected" is deliberately NOT an error here: a row that exists but
/// is policy-hidden looks identical to a row that does not exist, so callers map
/// empty results into their own business errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Policy denied: {0}")]
    PolicyDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<crate::filter::FilterError> for StoreError {
    fn from(err: crate::filter::FilterError) -> Self {
        StoreError::MalformedQuery(err.to_string())
    }
}

/// Map a raw sqlx error into the store taxonomy.
///
/// SQLSTATE 42501 covers both "permission denied" and "new row violates
/// row-level security policy"; either way the bound credential's policy said no.
pub fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("42501") => StoreError::PolicyDenied(db.message().to_string()),
            Some("23505") => StoreError::Conflict(db.message().to_string()),
            Some("42P01") | Some("42703") | Some("42883") => {
                StoreError::MalformedQuery(db.message().to_string())
            }
            _ => StoreError::Sqlx(err),
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Sqlx(err),
    }
}

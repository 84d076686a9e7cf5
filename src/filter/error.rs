use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid function name: {0}")]
    InvalidFunctionName(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("Row must be a non-empty JSON object")]
    InvalidRow,

    #[error("Unscoped {0} rejected: target filters are required")]
    UnscopedWrite(&'static str),
}

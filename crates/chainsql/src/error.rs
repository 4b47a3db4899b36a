//! Error types for chainsql

use thiserror::Error;

/// Result type alias for chainsql operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for query building and execution.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Builder misuse: missing table, bad identifier, unknown column in an alter session...
    ///
    /// These are raised synchronously by the verb that violates the invariant.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Driver error, surfaced unchanged.
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if this is a usage error
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Check if this error came from the database driver
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Query(_))
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

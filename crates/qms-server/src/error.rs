//! Server-level error types

use thiserror::Error;

use crate::db::DbError;

pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// Failures while starting or running the HTTP server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bind address '{0}'")]
    Address(String),
}

impl From<sqlx::Error> for ServerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DbError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ServerError::Address("nowhere:xx".to_string());
        assert_eq!(err.to_string(), "Invalid bind address 'nowhere:xx'");

        let err = ServerError::from(sqlx::Error::PoolClosed);
        assert!(err.to_string().starts_with("Database error"));
    }
}

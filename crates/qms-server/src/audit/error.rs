//! Audit error taxonomy

use thiserror::Error;

pub type AuditResult<T> = Result<T, AuditError>;

/// Errors surfaced by audit stores
///
/// None of these are retried inside the store. A failed append means the
/// triggering mutation is not recorded and must itself fail.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Out-of-range pagination, inverted time range, or an entry whose
    /// required fields are missing or inconsistent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The backing storage could not complete the read or write.
    #[error("Audit persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),

    /// A stored row could not be decoded back into an entry.
    #[error("Audit entry {id} is unreadable: {reason}")]
    CorruptEntry { id: i64, reason: String },
}

impl AuditError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

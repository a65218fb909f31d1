//! Error types for walletops-ledger crate.

use thiserror::Error;
use walletops_types::CallId;

/// Errors that can occur while reading, migrating or mutating the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A schema migration rejected the stored document.
    #[error("migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// Stored document was written by a newer schema.
    #[error("ledger schema version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Call referenced by a tx does not exist.
    #[error("call {0} does not exist")]
    UnknownCall(CallId),

    /// Uniqueness constraint violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A ledger invariant would be broken by the mutation.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Backend failure (lock poisoning, unavailable store).
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

//! Error types for walletops-types crate.

use thiserror::Error;

/// Errors raised while parsing user-supplied values into typed records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Role name is not one of the known roles or aliases.
    #[error("invalid role \"{0}\", must be one of unused, funding, transaction")]
    InvalidRole(String),

    /// Amount string could not be parsed.
    #[error("failed to parse amount \"{0}\"")]
    InvalidAmount(String),

    /// Amount does not fit in 128 bits.
    #[error("amount \"{0}\" overflows")]
    AmountOverflow(String),

    /// Address is not a 20-byte hex string.
    #[error("invalid address \"{0}\"")]
    InvalidAddress(String),
}

/// Result type for parsing operations.
pub type TypesResult<T> = std::result::Result<T, TypesError>;

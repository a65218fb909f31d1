//! Operation error types

use thiserror::Error;
use walletops_types::{Amount, TypesError};

/// Errors raised while parsing or running an operation.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("{operation}: {reason}")]
    InvalidArgs { operation: String, reason: String },

    #[error("Arguments do not belong to operation {0}")]
    ArgsMismatch(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Insufficient funds: need {needed} wei, have {available} wei")]
    InsufficientFunds { needed: Amount, available: Amount },

    #[error("Operation {0} has no access to the funding account")]
    FundingUnavailable(String),

    #[error("Transaction {hash} failed")]
    Reverted { hash: String },

    #[error("Lock error: {0}")]
    Lock(String),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error("{0}")]
    Execution(String),
}

impl From<reqwest::Error> for OperationError {
    fn from(e: reqwest::Error) -> Self {
        OperationError::Transport(e.to_string())
    }
}

/// Result type for operations
pub type Result<T> = std::result::Result<T, OperationError>;

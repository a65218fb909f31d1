//! CLI error types

use thiserror::Error;
use walletops_dispatch::{DispatchError, Severity};
use walletops_ledger::LedgerError;
use walletops_ops::OperationError;
use walletops_types::TypesError;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wrong or missing password
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Interactive prompt failed
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Dispatch run ended early
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Operation or capability error
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Parse error in shared types
    #[error("Invalid input: {0}")]
    Types(#[from] TypesError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit status for this error. Zero means the error is reported
    /// but the invocation still counts as handled.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Dispatch(e) => match e.severity() {
                Severity::Safe => 0,
                Severity::Critical => 2,
                Severity::Interrupted => 130,
                Severity::Internal => 1,
            },
            CliError::InvalidInput(_) | CliError::Auth(_) | CliError::Types(_) => 0,
            _ => 1,
        }
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(e: dialoguer::Error) -> Self {
        CliError::Prompt(e.to_string())
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

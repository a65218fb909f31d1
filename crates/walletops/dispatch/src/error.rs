//! Dispatch errors and their severity.

use thiserror::Error;
use walletops_ledger::LedgerError;
use walletops_ops::OperationError;
use walletops_types::{AccountId, CallId};

/// How the caller should treat a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operator mistake or empty work; nothing was written.
    Safe,
    /// The run cannot proceed at all (endpoint unreachable).
    Critical,
    /// Terminated mid-flight; pending attempts were recorded as errors.
    Interrupted,
    /// Ledger or runtime failure.
    Internal,
}

/// Errors that end a dispatch run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No operation named \"{0}\"")]
    UnknownOperation(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("No network named \"{0}\"")]
    UnknownNetwork(String),

    #[error("Could not connect to network \"{alias}\" at {endpoint}: {reason}")]
    NetworkUnreachable {
        alias: String,
        endpoint: String,
        reason: String,
    },

    #[error("Could not get a fee rate for \"{0}\"; set one on the network or pass a fee override")]
    NoFeeRate(String),

    #[error("No funding account found")]
    NoFundingAccount,

    #[error("Funding account {0} has no credential")]
    FundingPurged(AccountId),

    #[error("Cannot read credential of {account}: {reason}")]
    CredentialUnreadable { account: AccountId, reason: String },

    #[error("No accounts match the selection")]
    NoTargets,

    #[error("No calls recorded yet")]
    NoCalls,

    #[error("Call {0} does not exist")]
    UnknownCall(CallId),

    #[error("{call} ran \"{recorded}\", not \"{requested}\"")]
    RetryMismatch {
        call: CallId,
        recorded: String,
        requested: String,
    },

    #[error("Nothing to retry for {0}: every account already succeeded")]
    NothingToRetry(CallId),

    #[error("Interrupted: {pending} pending attempts of {call_id} recorded as errors")]
    Interrupted { call_id: CallId, pending: usize },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn severity(&self) -> Severity {
        match self {
            DispatchError::NetworkUnreachable { .. } => Severity::Critical,
            DispatchError::Interrupted { .. } => Severity::Interrupted,
            DispatchError::Ledger(_) | DispatchError::Internal(_) => Severity::Internal,
            _ => Severity::Safe,
        }
    }
}

impl From<OperationError> for DispatchError {
    fn from(e: OperationError) -> Self {
        match e {
            OperationError::UnknownOperation(name) => DispatchError::UnknownOperation(name),
            OperationError::InvalidArgs { .. } => DispatchError::InvalidArgs(e.to_string()),
            other => DispatchError::Internal(other.to_string()),
        }
    }
}

/// Result type for dispatch
pub type Result<T> = std::result::Result<T, DispatchError>;

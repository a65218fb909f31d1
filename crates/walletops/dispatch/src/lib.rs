//! Walletops dispatch - runs one operation across a batch of accounts.
//!
//! A run moves through resolution steps (operation, network, funding,
//! targets), then executes the operation concurrently per account and
//! flushes the ledger once. Every account attempt ends as exactly one tx row,
//! including attempts cut short by termination.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![warn(rust_2018_idioms)]

mod dispatcher;
mod error;
mod guard;
mod resolver;
mod summary;

pub use dispatcher::{
    BatchDispatcher, DispatchRequest, DispatchState, FundingSelection, RetryTarget,
    CREDENTIAL_UNREADABLE, NO_CREDENTIAL,
};
pub use error::{DispatchError, Result, Severity};
pub use guard::{CrashGuard, INTERRUPTED};
pub use resolver::{
    Connector, CredentialResolver, JsonRpcConnector, ResolvedNetwork, StaticConnector,
};
pub use summary::{AccountOutcome, RunSummary};

//! Walletops operations.
//!
//! Operations are a fixed set registered at start-up. Each one parses its own
//! argument string and runs once per target account against the capabilities
//! handed to it:
//!
//! - [`Signer`] wraps credentials at rest
//! - [`Transport`] talks to the network endpoint
//! - [`ProgressReporter`] receives per-account status lines
//!
//! Operations that draw from the shared funding account declare
//! [`ResourceClass::SharedFunding`] and can only reach the funding handle
//! through a named lock from the [`LockRegistry`].

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod builtin;
mod capability;
mod cipher;
mod error;
mod jsonrpc;
mod lock;
mod memory;
mod operation;
mod registry;

pub use capability::{
    LogReporter, ProgressReporter, Receipt, SigningHandle, Signer, TransferRequest, Transport,
    TxHandle,
};
pub use cipher::PasswordSigner;
pub use error::{OperationError, Result};
pub use jsonrpc::JsonRpcTransport;
pub use lock::{LockRegistry, NamedGuard};
pub use memory::{InMemoryTransport, SubmissionWindow};
pub use operation::{FundingAccess, FundingPermit, Operation, OperationArgs, OperationContext, ResourceClass};
pub use registry::OperationRegistry;

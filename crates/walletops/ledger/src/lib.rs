//! Walletops ledger - durable record of batch invocations.
//!
//! This crate owns the single ledger document:
//! - accounts and network targets registered by the operator
//! - one call row per batch invocation (retries reuse the original row)
//! - append-only tx rows, one per account attempt
//!
//! The document is read lazily, migrated once on first read, mutated in memory
//! and written back only by [`LedgerStore::flush`].

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![warn(rust_2018_idioms)]

mod backend;
mod error;
pub mod migrations;
mod store;

pub use backend::{InMemoryBackend, JsonFileBackend, LedgerBackend};
pub use error::{LedgerError, Result};
pub use migrations::LATEST_VERSION;
pub use store::{
    AddAccountsReport, LedgerStore, NetworkUpdate, NewAccount, NewCall, NewNetwork, NewTx, Table,
};

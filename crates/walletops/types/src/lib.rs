//! Walletops Types - shared data model
//!
//! This crate defines the records every other walletops layer speaks:
//! - accounts with a role and an (optionally purged) encrypted credential
//! - network targets an operation runs against
//! - calls (one per batch invocation) and txs (one per account outcome)
//! - the persisted ledger document that holds all of the above
//!
//! Account selection filters and amount parsing live here too, so the ledger,
//! the operations and the command line agree on one definition.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]

pub mod account;
pub mod amount;
pub mod error;
pub mod filter;
pub mod ids;
pub mod ledger;
pub mod network;

pub use account::{is_valid_address, require_address, Account, AccountRole};
pub use amount::{format_amount, parse_amount, Amount, WEI_PER_ETHER, WEI_PER_GWEI};
pub use error::{TypesError, TypesResult};
pub use filter::{AccountFilter, PurgeState};
pub use ids::{AccountId, CallId, NetworkId, TxId};
pub use ledger::{Call, LedgerDocument, Tx, TxOutcome};
pub use network::{split_alias, NetworkTarget};

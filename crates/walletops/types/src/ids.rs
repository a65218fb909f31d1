//! Strongly-typed identifiers for ledger rows
//!
//! Every table in the ledger uses monotonically allocated integer ids. They are
//! wrapped in newtypes so an account id can never be passed where a call id is
//! expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! ledger_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            pub fn value(&self) -> u64 {
                self.0
            }

            /// The id allocated after this one.
            pub fn next(&self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

ledger_id!(
    /// Identifier of a registered account
    AccountId,
    "wid "
);
ledger_id!(
    /// Identifier of a network target
    NetworkId,
    "net "
);
ledger_id!(
    /// Identifier of a batch invocation
    CallId,
    "call "
);
ledger_id!(
    /// Identifier of a per-account outcome row
    TxId,
    "tx "
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&CallId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: AccountId = serde_json::from_str("12").unwrap();
        assert_eq!(back, AccountId::new(12));
    }

    #[test]
    fn next_is_strictly_greater() {
        let id = TxId::new(41);
        assert!(id.next() > id);
        assert_eq!(id.next().value(), 42);
    }
}

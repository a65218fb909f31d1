//! Call and transaction records, and the document that persists them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::Account;
use crate::ids::{AccountId, CallId, NetworkId, TxId};
use crate::network::NetworkTarget;

/// One batch invocation. Immutable once written; a retry reuses the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub id: CallId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<NetworkId>,
    pub operation_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_args: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one account's attempt within a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxOutcome {
    Success,
    Error,
}

impl TxOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, TxOutcome::Error)
    }
}

impl fmt::Display for TxOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxOutcome::Success => f.write_str("success"),
            TxOutcome::Error => f.write_str("error"),
        }
    }
}

/// Per-account outcome row. Append-only; the row with the greatest id for a
/// `(call_id, account_id)` pair is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tx {
    pub id: TxId,
    pub call_id: CallId,
    pub account_id: AccountId,
    pub outcome: TxOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// The whole persisted ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerDocument {
    #[serde(default)]
    pub auth_cipher: String,
    #[serde(default)]
    pub migration_version: u32,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub networks: Vec<NetworkTarget>,
    #[serde(default)]
    pub calls: Vec<Call>,
    #[serde(default)]
    pub txs: Vec<Tx>,
}

impl LedgerDocument {
    /// Empty document stamped with the given schema version.
    pub fn empty(migration_version: u32) -> Self {
        Self {
            migration_version,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_uses_camel_case_keys() {
        let mut doc = LedgerDocument::empty(3);
        doc.calls.push(Call {
            id: CallId::new(1),
            network_id: Some(NetworkId::new(2)),
            operation_name: "balance".into(),
            description: None,
            raw_args: Some(String::new()),
            created_at: Utc::now(),
        });
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["migrationVersion"], 3);
        assert_eq!(json["calls"][0]["operationName"], "balance");
        assert_eq!(json["calls"][0]["networkId"], 2);
        assert!(json.get("authCipher").is_some());
    }

    #[test]
    fn missing_tables_default_to_empty() {
        let doc: LedgerDocument = serde_json::from_str(r#"{"migrationVersion": 3}"#).unwrap();
        assert!(doc.accounts.is_empty());
        assert!(doc.txs.is_empty());
    }
}

//! Accounts and their roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{TypesError, TypesResult};
use crate::ids::AccountId;

/// Role an account plays in batch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    /// Registered but not selected by default.
    #[default]
    Unused,
    /// The single shared capital source.
    Funding,
    /// Selected by default for every fresh invocation.
    Transaction,
}

impl AccountRole {
    pub const ALL: [AccountRole; 3] = [
        AccountRole::Unused,
        AccountRole::Funding,
        AccountRole::Transaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Unused => "unused",
            AccountRole::Funding => "funding",
            AccountRole::Transaction => "transaction",
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = TypesError;

    /// Accepts full role names or their one-letter aliases.
    fn from_str(s: &str) -> TypesResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unused" | "u" => Ok(AccountRole::Unused),
            "funding" | "f" => Ok(AccountRole::Funding),
            "transaction" | "t" => Ok(AccountRole::Transaction),
            _ => Err(TypesError::InvalidRole(s.to_string())),
        }
    }
}

/// A registered account.
///
/// `encrypted_key == None` means the credential was purged; a purged account
/// always carries [`AccountRole::Unused`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub role: AccountRole,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
}

impl Account {
    pub fn new(
        id: AccountId,
        role: AccountRole,
        address: impl Into<String>,
        encrypted_key: Option<String>,
    ) -> Self {
        Self {
            id,
            role,
            address: address.into(),
            encrypted_key,
        }
    }

    pub fn is_purged(&self) -> bool {
        self.encrypted_key.is_none()
    }

    /// Addresses compare case-insensitively.
    pub fn has_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }

    /// Short label used in progress output, e.g. `wid 3, 0x5aAe`.
    pub fn label(&self) -> String {
        let short: String = self.address.chars().take(7).collect();
        format!("{}, {}", self.id, short)
    }

    /// Drop the credential. Purged accounts fall back to the unused role.
    pub fn purge(&mut self) {
        self.encrypted_key = None;
        self.role = AccountRole::Unused;
    }
}

/// Whether `address` is a `0x`-prefixed 20-byte hex string.
pub fn is_valid_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .map(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Validate an address, returning it unchanged.
pub fn require_address(address: &str) -> TypesResult<&str> {
    if is_valid_address(address) {
        Ok(address)
    } else {
        Err(TypesError::InvalidAddress(address.to_string()))
    }
}

//! Network targets.

use serde::{Deserialize, Serialize};

use crate::amount::{serde_opt_amount, Amount};
use crate::ids::NetworkId;

/// A remote endpoint operations run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTarget {
    pub id: NetworkId,
    /// Unique alias, optionally suffixed with a version integer (`sepolia2`).
    pub alias: String,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Fixed fee rate in wei, used instead of querying the endpoint.
    #[serde(default, with = "serde_opt_amount", skip_serializing_if = "Option::is_none")]
    pub gas_override: Option<Amount>,
}

impl NetworkTarget {
    pub fn new(id: NetworkId, alias: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            id,
            alias: alias.into(),
            endpoint: endpoint.into(),
            chain_id: None,
            gas_override: None,
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_gas_override(mut self, gas: Amount) -> Self {
        self.gas_override = Some(gas);
        self
    }

    /// Alias base without its version suffix.
    pub fn alias_base(&self) -> &str {
        split_alias(&self.alias).0
    }

    pub fn alias_version(&self) -> Option<u32> {
        split_alias(&self.alias).1
    }
}

/// Split an alias into its base and trailing version integer.
///
/// `"sepolia2"` gives `("sepolia", Some(2))`, `"mainnet"` gives
/// `("mainnet", None)`. An alias made only of digits has no version.
pub fn split_alias(alias: &str) -> (&str, Option<u32>) {
    let base = alias.trim_end_matches(|c: char| c.is_ascii_digit());
    if base.is_empty() || base.len() == alias.len() {
        return (alias, None);
    }
    match alias[base.len()..].parse::<u32>() {
        Ok(version) => (base, Some(version)),
        Err(_) => (alias, None),
    }
}

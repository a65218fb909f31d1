//! Account selection filters.
//!
//! A filter is a conjunction of optional predicates. Unset fields match
//! everything, so `AccountFilter::default()` selects every account.

use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountRole};
use crate::ids::AccountId;

/// Credential state to select on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurgeState {
    #[default]
    All,
    Purged,
    Unpurged,
}

/// Conjunctive account filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFilter {
    pub id: Option<AccountId>,
    pub role: Option<AccountRole>,
    pub address: Option<String>,
    #[serde(default)]
    pub purge_state: PurgeState,
}

impl AccountFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: AccountId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_role(role: AccountRole) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_purge_state(mut self, purge_state: PurgeState) -> Self {
        self.purge_state = purge_state;
        self
    }

    /// Whether a single account satisfies every set predicate.
    pub fn matches(&self, account: &Account) -> bool {
        self.match_id(account)
            && self.match_role(account)
            && self.match_purge(account)
            && self.match_address(account)
    }

    /// Select matching accounts, preserving input order.
    pub fn apply<'a, I>(&self, accounts: I) -> Vec<Account>
    where
        I: IntoIterator<Item = &'a Account>,
    {
        accounts
            .into_iter()
            .filter(|a| self.match_id(a))
            .filter(|a| self.match_role(a))
            .filter(|a| self.match_purge(a))
            .filter(|a| self.match_address(a))
            .cloned()
            .collect()
    }

    fn match_id(&self, account: &Account) -> bool {
        self.id.map_or(true, |id| account.id == id)
    }

    fn match_role(&self, account: &Account) -> bool {
        self.role.map_or(true, |role| account.role == role)
    }

    fn match_purge(&self, account: &Account) -> bool {
        match self.purge_state {
            PurgeState::All => true,
            PurgeState::Purged => account.is_purged(),
            PurgeState::Unpurged => !account.is_purged(),
        }
    }

    fn match_address(&self, account: &Account) -> bool {
        self.address
            .as_deref()
            .map_or(true, |address| account.has_address(address))
    }
}

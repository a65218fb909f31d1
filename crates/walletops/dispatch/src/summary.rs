//! Run summary, read back from the ledger after flushing.

use serde::Serialize;
use walletops_ledger::LedgerStore;
use walletops_types::{AccountId, CallId, TxId, TxOutcome};

use crate::error::Result;

/// Latest outcome of one account in a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountOutcome {
    pub account_id: AccountId,
    pub tx_id: TxId,
    pub outcome: TxOutcome,
    pub detail: Option<String>,
}

/// What a run did, per account.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub call_id: CallId,
    pub operation: String,
    pub retry: bool,
    pub outcomes: Vec<AccountOutcome>,
}

impl RunSummary {
    /// Build from the ledger's latest tx per account, restricted to the
    /// accounts this run dispatched.
    pub fn from_ledger(
        ledger: &LedgerStore,
        call_id: CallId,
        operation: impl Into<String>,
        retry: bool,
        accounts: &[AccountId],
    ) -> Result<Self> {
        let latest = ledger.latest_outcomes(call_id)?;
        let outcomes = accounts
            .iter()
            .filter_map(|id| latest.get(id))
            .map(|tx| AccountOutcome {
                account_id: tx.account_id,
                tx_id: tx.id,
                outcome: tx.outcome,
                detail: tx.detail.clone(),
            })
            .collect();
        Ok(Self {
            call_id,
            operation: operation.into(),
            retry,
            outcomes,
        })
    }

    pub fn successes(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome == TxOutcome::Success)
            .count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }

    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

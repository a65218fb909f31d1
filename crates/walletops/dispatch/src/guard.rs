//! Crash guard: pending placeholders for in-flight account attempts.
//!
//! Each attempt registers a placeholder before the operation runs. A normal
//! finish settles it into the real outcome; termination drains every
//! remaining placeholder into an error row. Both happen under one lock, so a
//! placeholder turns into exactly one tx row.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;
use walletops_ledger::{LedgerStore, NewTx};
use walletops_types::{AccountId, CallId};

use crate::error::{DispatchError, Result};

/// Detail recorded for attempts cut short by termination.
pub const INTERRUPTED: &str = "interrupted";

#[derive(Default)]
struct Pending {
    accounts: BTreeSet<AccountId>,
    closed: bool,
}

pub struct CrashGuard {
    ledger: Arc<LedgerStore>,
    call_id: CallId,
    pending: Mutex<Pending>,
}

impl CrashGuard {
    pub fn new(ledger: Arc<LedgerStore>, call_id: CallId) -> Self {
        Self {
            ledger,
            call_id,
            pending: Mutex::new(Pending::default()),
        }
    }

    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    fn lock(&self) -> Result<MutexGuard<'_, Pending>> {
        self.pending
            .lock()
            .map_err(|_| DispatchError::Internal("crash guard lock poisoned".to_string()))
    }

    /// Register a placeholder. Returns `false` once the guard has drained;
    /// the attempt must not start then.
    pub fn register(&self, account: AccountId) -> Result<bool> {
        let mut pending = self.lock()?;
        if pending.closed {
            return Ok(false);
        }
        pending.accounts.insert(account);
        Ok(true)
    }

    /// Replace a placeholder with the real outcome. Returns `false` if the
    /// placeholder was already drained, in which case nothing is recorded.
    pub fn settle(&self, tx: NewTx) -> Result<bool> {
        let mut pending = self.lock()?;
        if !pending.accounts.contains(&tx.account_id) {
            return Ok(false);
        }
        self.ledger.append_txs(vec![tx.clone()])?;
        pending.accounts.remove(&tx.account_id);
        Ok(true)
    }

    /// Record an outcome that never had a placeholder. Returns `false` once
    /// the guard has drained.
    pub fn record(&self, tx: NewTx) -> Result<bool> {
        let pending = self.lock()?;
        if pending.closed {
            return Ok(false);
        }
        self.ledger.append_txs(vec![tx])?;
        Ok(true)
    }

    /// Turn every remaining placeholder into an error row with `detail` and
    /// refuse further registrations. Returns how many rows were written.
    pub fn drain(&self, detail: &str) -> Result<usize> {
        let mut pending = self.lock()?;
        pending.closed = true;
        if pending.accounts.is_empty() {
            return Ok(0);
        }
        let txs: Vec<NewTx> = pending
            .accounts
            .iter()
            .map(|account| NewTx::error(self.call_id, *account, detail))
            .collect();
        let count = txs.len();
        self.ledger.append_txs(txs)?;
        for account in &pending.accounts {
            warn!(call_id = %self.call_id, account_id = %account, detail, "pending attempt recorded as error");
        }
        pending.accounts.clear();
        Ok(count)
    }

    /// [`CrashGuard::drain`] with the interrupted marker.
    pub fn interrupt(&self) -> Result<usize> {
        self.drain(INTERRUPTED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walletops_ledger::NewCall;
    use walletops_types::TxOutcome;

    fn guard() -> (Arc<LedgerStore>, CrashGuard) {
        let ledger = Arc::new(LedgerStore::in_memory());
        let call = ledger.append_call(NewCall::default()).unwrap();
        let guard = CrashGuard::new(ledger.clone(), call.id);
        (ledger, guard)
    }

    #[test]
    fn interrupt_records_each_placeholder_once() {
        let (ledger, guard) = guard();
        for id in 1..=3 {
            assert!(guard.register(AccountId::new(id)).unwrap());
        }
        assert!(guard
            .settle(NewTx::success(guard.call_id(), AccountId::new(2), "ok"))
            .unwrap());

        assert_eq!(guard.interrupt().unwrap(), 2);
        assert_eq!(guard.interrupt().unwrap(), 0);

        let txs = ledger.get_txs_for_call(guard.call_id(), false).unwrap();
        assert_eq!(txs.len(), 3);
        let errors: Vec<_> = txs.iter().filter(|t| t.outcome == TxOutcome::Error).collect();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|t| t.detail.as_deref() == Some(INTERRUPTED)));
    }

    #[test]
    fn late_settle_after_interrupt_is_dropped() {
        let (ledger, guard) = guard();
        guard.register(AccountId::new(1)).unwrap();
        guard.interrupt().unwrap();
        assert!(!guard
            .settle(NewTx::success(guard.call_id(), AccountId::new(1), "late"))
            .unwrap());
        assert!(!guard.register(AccountId::new(2)).unwrap());
        assert_eq!(ledger.get_txs_for_call(guard.call_id(), false).unwrap().len(), 1);
    }
}

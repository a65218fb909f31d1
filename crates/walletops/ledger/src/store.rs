//! The ledger store: lazy load, single migration pass, in-memory mutation,
//! explicit flush.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};
use walletops_types::{
    split_alias, Account, AccountFilter, AccountId, AccountRole, Amount, Call, CallId,
    LedgerDocument, NetworkId, NetworkTarget, Tx, TxId, TxOutcome,
};

use crate::backend::{InMemoryBackend, JsonFileBackend, LedgerBackend};
use crate::error::{LedgerError, Result};
use crate::migrations::{self, LATEST_VERSION};

/// Tables with monotonic ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Accounts,
    Networks,
    Calls,
    Txs,
}

/// Fields of a call row; the store allocates the id and timestamp.
#[derive(Debug, Clone, Default)]
pub struct NewCall {
    pub network_id: Option<NetworkId>,
    pub operation_name: String,
    pub description: Option<String>,
    pub raw_args: Option<String>,
}

/// Fields of a tx row; the store allocates the id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTx {
    pub call_id: CallId,
    pub account_id: AccountId,
    pub outcome: TxOutcome,
    pub detail: Option<String>,
}

impl NewTx {
    pub fn success(call_id: CallId, account_id: AccountId, detail: impl Into<String>) -> Self {
        Self {
            call_id,
            account_id,
            outcome: TxOutcome::Success,
            detail: Some(detail.into()),
        }
    }

    pub fn error(call_id: CallId, account_id: AccountId, detail: impl Into<String>) -> Self {
        Self {
            call_id,
            account_id,
            outcome: TxOutcome::Error,
            detail: Some(detail.into()),
        }
    }
}

/// An account to register.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub address: String,
    pub role: AccountRole,
    pub encrypted_key: String,
}

/// What [`LedgerStore::add_accounts`] did with each input.
#[derive(Debug, Clone, Default)]
pub struct AddAccountsReport {
    /// The `create` call recording the additions, if anything was added.
    pub call: Option<Call>,
    pub added: Vec<Account>,
    /// Purged accounts whose credential was restored.
    pub restored: Vec<Account>,
    /// Addresses already registered with a live credential.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewNetwork {
    pub alias: String,
    pub endpoint: String,
    pub chain_id: Option<u64>,
    pub gas_override: Option<Amount>,
}

/// Partial update of a network target. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct NetworkUpdate {
    pub endpoint: Option<String>,
    pub chain_id: Option<u64>,
    pub gas_override: Option<Amount>,
    pub clear_gas_override: bool,
}

struct Loaded {
    doc: LedgerDocument,
    dirty: bool,
}

enum LedgerState {
    Uninitialized,
    Ready(Loaded),
}

/// Durable store of accounts, networks, calls and txs.
///
/// All access goes through one coarse lock. Concurrent tasks appending txs
/// never interleave partial writes, and the backing document is read at most
/// once per store.
pub struct LedgerStore {
    backend: Arc<dyn LedgerBackend>,
    state: Mutex<LedgerState>,
}

impl LedgerStore {
    pub fn new(backend: Arc<dyn LedgerBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(LedgerState::Uninitialized),
        }
    }

    /// Store backed by a JSON file.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(JsonFileBackend::new(path)))
    }

    /// Store with no durable backing (for testing).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    pub fn location(&self) -> String {
        self.backend.describe()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| LedgerError::Backend("ledger lock poisoned".to_string()))
    }

    fn load(&self) -> Result<Loaded> {
        match self.backend.load()? {
            None => {
                debug!(location = %self.backend.describe(), "no ledger found, starting empty");
                Ok(Loaded {
                    doc: LedgerDocument::empty(LATEST_VERSION),
                    dirty: false,
                })
            }
            Some(raw) => {
                let (doc, applied) = migrations::migrate(raw)?;
                if !applied.is_empty() {
                    info!(
                        location = %self.backend.describe(),
                        applied = ?applied,
                        "ledger migrated"
                    );
                }
                Ok(Loaded {
                    doc,
                    dirty: !applied.is_empty(),
                })
            }
        }
    }

    fn ready<'a>(&self, state: &'a mut LedgerState) -> Result<&'a mut Loaded> {
        if let LedgerState::Uninitialized = state {
            *state = LedgerState::Ready(self.load()?);
        }
        match state {
            LedgerState::Ready(loaded) => Ok(loaded),
            LedgerState::Uninitialized => {
                Err(LedgerError::Backend("ledger failed to initialize".to_string()))
            }
        }
    }

    fn read<T>(&self, f: impl FnOnce(&LedgerDocument) -> T) -> Result<T> {
        let mut state = self.lock()?;
        let loaded = self.ready(&mut state)?;
        Ok(f(&loaded.doc))
    }

    fn write<T>(&self, f: impl FnOnce(&mut LedgerDocument) -> Result<T>) -> Result<T> {
        let mut state = self.lock()?;
        let loaded = self.ready(&mut state)?;
        let out = f(&mut loaded.doc)?;
        loaded.dirty = true;
        Ok(out)
    }

    // -- lifecycle -------------------------------------------------------

    /// Write the document if it changed. Returns whether a write happened.
    pub fn flush(&self) -> Result<bool> {
        let mut state = self.lock()?;
        match &mut *state {
            LedgerState::Ready(loaded) if loaded.dirty => {
                let value = serde_json::to_value(&loaded.doc)?;
                self.backend.store(&value)?;
                loaded.dirty = false;
                debug!(location = %self.backend.describe(), "ledger flushed");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Delete the backing document and reset to an empty ledger.
    /// Returns whether a document existed.
    pub fn purge(&self) -> Result<bool> {
        let mut state = self.lock()?;
        let existed = self.backend.remove()?;
        *state = LedgerState::Ready(Loaded {
            doc: LedgerDocument::empty(LATEST_VERSION),
            dirty: false,
        });
        info!(location = %self.backend.describe(), existed, "ledger purged");
        Ok(existed)
    }

    pub fn is_dirty(&self) -> Result<bool> {
        let state = self.lock()?;
        Ok(matches!(&*state, LedgerState::Ready(loaded) if loaded.dirty))
    }

    pub fn migration_version(&self) -> Result<u32> {
        self.read(|doc| doc.migration_version)
    }

    /// Copy of the whole document.
    pub fn snapshot(&self) -> Result<LedgerDocument> {
        self.read(|doc| doc.clone())
    }

    // -- credentials cipher ----------------------------------------------

    /// The password check cipher; empty until a password is set.
    pub fn auth_cipher(&self) -> Result<String> {
        self.read(|doc| doc.auth_cipher.clone())
    }

    pub fn set_auth_cipher(&self, cipher: impl Into<String>) -> Result<()> {
        let cipher = cipher.into();
        self.write(|doc| {
            doc.auth_cipher = cipher;
            Ok(())
        })
    }

    // -- queries ---------------------------------------------------------

    pub fn get_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>> {
        self.read(|doc| filter.apply(&doc.accounts))
    }

    pub fn funding_account(&self) -> Result<Option<Account>> {
        self.read(|doc| {
            doc.accounts
                .iter()
                .find(|a| a.role == AccountRole::Funding)
                .cloned()
        })
    }

    /// All calls, or the one with `id`.
    pub fn get_calls(&self, id: Option<CallId>) -> Result<Vec<Call>> {
        self.read(|doc| {
            doc.calls
                .iter()
                .filter(|c| id.map_or(true, |id| c.id == id))
                .cloned()
                .collect()
        })
    }

    pub fn get_call(&self, id: CallId) -> Result<Option<Call>> {
        self.read(|doc| doc.calls.iter().find(|c| c.id == id).cloned())
    }

    pub fn get_txs_for_call(&self, call_id: CallId, only_errors: bool) -> Result<Vec<Tx>> {
        self.read(|doc| {
            doc.txs
                .iter()
                .filter(|t| t.call_id == call_id)
                .filter(|t| !only_errors || t.outcome.is_error())
                .cloned()
                .collect()
        })
    }

    /// Greatest id in `table`, 0 when empty.
    pub fn largest_id(&self, table: Table) -> Result<u64> {
        self.read(|doc| largest(doc, table))
    }

    /// Authoritative tx per account for a call: the one with the greatest id.
    pub fn latest_outcomes(&self, call_id: CallId) -> Result<BTreeMap<AccountId, Tx>> {
        self.read(|doc| latest_per_account(doc, call_id))
    }

    /// Accounts whose latest tx for `call_id` is an error, in ledger order.
    pub fn retry_candidates(&self, call_id: CallId) -> Result<Vec<Account>> {
        self.read(|doc| {
            let latest = latest_per_account(doc, call_id);
            doc.accounts
                .iter()
                .filter(|a| latest.get(&a.id).map_or(false, |t| t.outcome.is_error()))
                .cloned()
                .collect()
        })
    }

    /// Resolve a network alias.
    ///
    /// An exact alias match wins. An unversioned alias with no exact match
    /// picks the highest version sharing its base (`sepolia` finds `sepolia3`
    /// over `sepolia2`).
    pub fn get_network(&self, alias: &str) -> Result<Option<NetworkTarget>> {
        self.read(|doc| find_network(&doc.networks, alias).cloned())
    }

    pub fn list_networks(&self) -> Result<Vec<NetworkTarget>> {
        self.read(|doc| doc.networks.clone())
    }

    // -- mutations -------------------------------------------------------

    /// Append a call row with the next call id.
    pub fn append_call(&self, new: NewCall) -> Result<Call> {
        self.write(|doc| Ok(push_call(doc, new)))
    }

    /// Append tx rows, assigning consecutive ids. Every row must reference an
    /// existing call; nothing is appended otherwise.
    pub fn append_txs(&self, txs: Vec<NewTx>) -> Result<Vec<Tx>> {
        self.write(|doc| push_txs(doc, txs))
    }

    /// Replace an account's credential. `None` purges it.
    pub fn set_account_credential(&self, id: AccountId, key: Option<String>) -> Result<()> {
        self.write(|doc| {
            let account = account_mut(doc, id)?;
            match key {
                Some(key) => account.encrypted_key = Some(key),
                None => account.purge(),
            }
            Ok(())
        })
    }

    /// Assign `role` to every listed account.
    ///
    /// Only one account may be promoted to funding; the previous funding
    /// account, if any, is demoted to unused. Purged accounts can only be
    /// unused.
    pub fn set_account_role(&self, ids: &[AccountId], role: AccountRole) -> Result<usize> {
        self.write(|doc| {
            if role == AccountRole::Funding && ids.len() > 1 {
                return Err(LedgerError::InvariantViolation(
                    "only one account may hold the funding role".to_string(),
                ));
            }
            for id in ids {
                let account = doc
                    .accounts
                    .iter()
                    .find(|a| a.id == *id)
                    .ok_or_else(|| LedgerError::NotFound(format!("account {}", id)))?;
                if account.is_purged() && role != AccountRole::Unused {
                    return Err(LedgerError::InvariantViolation(format!(
                        "account {} is purged and must stay unused",
                        id
                    )));
                }
            }
            if role == AccountRole::Funding {
                demote_funding(doc);
            }
            for account in doc.accounts.iter_mut().filter(|a| ids.contains(&a.id)) {
                account.role = role;
            }
            Ok(ids.len())
        })
    }

    /// Register accounts.
    ///
    /// New addresses get the next account ids and are recorded under a single
    /// `create` call with one success tx each. An address that exists but was
    /// purged gets its credential and role back; one with a live credential is
    /// skipped.
    pub fn add_accounts(&self, accounts: Vec<NewAccount>) -> Result<AddAccountsReport> {
        self.write(|doc| {
            let funding_requests = accounts
                .iter()
                .filter(|a| a.role == AccountRole::Funding)
                .count();
            if funding_requests > 1 {
                return Err(LedgerError::InvariantViolation(
                    "only one account may hold the funding role".to_string(),
                ));
            }

            let mut report = AddAccountsReport::default();
            let mut next_id = largest(doc, Table::Accounts);
            for new in accounts {
                let existing = doc.accounts.iter().position(|a| a.has_address(&new.address));
                if let Some(index) = existing {
                    if !doc.accounts[index].is_purged() {
                        report.skipped.push(new.address);
                        continue;
                    }
                }
                if new.role == AccountRole::Funding {
                    demote_funding(doc);
                }
                if let Some(index) = existing {
                    let account = &mut doc.accounts[index];
                    account.encrypted_key = Some(new.encrypted_key);
                    account.role = new.role;
                    report.restored.push(account.clone());
                    continue;
                }
                next_id += 1;
                let account = Account::new(
                    AccountId::new(next_id),
                    new.role,
                    new.address,
                    Some(new.encrypted_key),
                );
                doc.accounts.push(account.clone());
                report.added.push(account);
            }

            if !report.added.is_empty() {
                let n = report.added.len();
                let call = push_call(
                    doc,
                    NewCall {
                        network_id: None,
                        operation_name: "create".to_string(),
                        description: Some(format!(
                            "{} account{}",
                            n,
                            if n == 1 { "" } else { "s" }
                        )),
                        raw_args: None,
                    },
                );
                let txs = report
                    .added
                    .iter()
                    .map(|a| NewTx {
                        call_id: call.id,
                        account_id: a.id,
                        outcome: TxOutcome::Success,
                        detail: None,
                    })
                    .collect();
                push_txs(doc, txs)?;
                report.call = Some(call);
            }
            Ok(report)
        })
    }

    /// Drop the credentials of the listed accounts. Returns how many changed.
    pub fn purge_accounts(&self, ids: &[AccountId]) -> Result<usize> {
        self.write(|doc| {
            let mut purged = 0;
            for account in doc.accounts.iter_mut().filter(|a| ids.contains(&a.id)) {
                if !account.is_purged() || account.role != AccountRole::Unused {
                    account.purge();
                    purged += 1;
                }
            }
            Ok(purged)
        })
    }

    /// Re-encrypt every live credential and install a new auth cipher.
    ///
    /// All transforms run before anything is written; one failure leaves the
    /// ledger unchanged.
    pub fn rekey_credentials<F, E>(&self, auth_cipher: String, mut transform: F) -> Result<usize>
    where
        F: FnMut(&Account, &str) -> std::result::Result<String, E>,
        E: Display,
    {
        self.write(|doc| {
            let mut rekeyed = Vec::new();
            for (index, account) in doc.accounts.iter().enumerate() {
                if let Some(key) = account.encrypted_key.as_deref() {
                    let key = transform(account, key).map_err(|e| {
                        LedgerError::InvariantViolation(format!(
                            "cannot re-encrypt credential of {}: {}",
                            account.id, e
                        ))
                    })?;
                    rekeyed.push((index, key));
                }
            }
            let count = rekeyed.len();
            for (index, key) in rekeyed {
                doc.accounts[index].encrypted_key = Some(key);
            }
            doc.auth_cipher = auth_cipher;
            Ok(count)
        })
    }

    pub fn add_network(&self, new: NewNetwork) -> Result<NetworkTarget> {
        self.write(|doc| {
            if doc.networks.iter().any(|n| n.alias == new.alias) {
                return Err(LedgerError::Conflict(format!(
                    "network alias '{}' already exists",
                    new.alias
                )));
            }
            let id = NetworkId::new(largest(doc, Table::Networks) + 1);
            let network = NetworkTarget {
                id,
                alias: new.alias,
                endpoint: new.endpoint,
                chain_id: new.chain_id,
                gas_override: new.gas_override,
            };
            doc.networks.push(network.clone());
            Ok(network)
        })
    }

    pub fn update_network(&self, alias: &str, update: NetworkUpdate) -> Result<NetworkTarget> {
        self.write(|doc| {
            let network = doc
                .networks
                .iter_mut()
                .find(|n| n.alias == alias)
                .ok_or_else(|| LedgerError::NotFound(format!("network '{}'", alias)))?;
            if let Some(endpoint) = update.endpoint {
                network.endpoint = endpoint;
            }
            if let Some(chain_id) = update.chain_id {
                network.chain_id = Some(chain_id);
            }
            if update.clear_gas_override {
                network.gas_override = None;
            } else if let Some(gas) = update.gas_override {
                network.gas_override = Some(gas);
            }
            Ok(network.clone())
        })
    }

    /// Remove a network by exact alias. Past calls keep their network id.
    pub fn remove_network(&self, alias: &str) -> Result<bool> {
        let mut state = self.lock()?;
        let loaded = self.ready(&mut state)?;
        let before = loaded.doc.networks.len();
        loaded.doc.networks.retain(|n| n.alias != alias);
        let removed = loaded.doc.networks.len() != before;
        if removed {
            loaded.dirty = true;
        }
        Ok(removed)
    }
}

fn largest(doc: &LedgerDocument, table: Table) -> u64 {
    match table {
        Table::Accounts => doc.accounts.iter().map(|a| a.id.value()).max(),
        Table::Networks => doc.networks.iter().map(|n| n.id.value()).max(),
        Table::Calls => doc.calls.iter().map(|c| c.id.value()).max(),
        Table::Txs => doc.txs.iter().map(|t| t.id.value()).max(),
    }
    .unwrap_or(0)
}

fn latest_per_account(doc: &LedgerDocument, call_id: CallId) -> BTreeMap<AccountId, Tx> {
    let mut latest: BTreeMap<AccountId, Tx> = BTreeMap::new();
    for tx in doc.txs.iter().filter(|t| t.call_id == call_id) {
        let newer = latest.get(&tx.account_id).map_or(true, |t| tx.id > t.id);
        if newer {
            latest.insert(tx.account_id, tx.clone());
        }
    }
    latest
}

fn find_network<'a>(networks: &'a [NetworkTarget], alias: &str) -> Option<&'a NetworkTarget> {
    if let Some(exact) = networks.iter().find(|n| n.alias == alias) {
        return Some(exact);
    }
    let (base, version) = split_alias(alias);
    if version.is_some() {
        return None;
    }
    networks
        .iter()
        .filter(|n| n.alias_base() == base)
        .filter_map(|n| n.alias_version().map(|v| (v, n)))
        .max_by_key(|(v, _)| *v)
        .map(|(_, n)| n)
}

fn push_call(doc: &mut LedgerDocument, new: NewCall) -> Call {
    let call = Call {
        id: CallId::new(largest(doc, Table::Calls) + 1),
        network_id: new.network_id,
        operation_name: new.operation_name,
        description: new.description,
        raw_args: new.raw_args,
        created_at: Utc::now(),
    };
    doc.calls.push(call.clone());
    call
}

fn push_txs(doc: &mut LedgerDocument, txs: Vec<NewTx>) -> Result<Vec<Tx>> {
    if let Some(missing) = txs
        .iter()
        .find(|t| !doc.calls.iter().any(|c| c.id == t.call_id))
    {
        return Err(LedgerError::UnknownCall(missing.call_id));
    }
    let mut next = largest(doc, Table::Txs);
    let now = Utc::now();
    let rows: Vec<Tx> = txs
        .into_iter()
        .map(|t| {
            next += 1;
            Tx {
                id: TxId::new(next),
                call_id: t.call_id,
                account_id: t.account_id,
                outcome: t.outcome,
                detail: t.detail,
                recorded_at: now,
            }
        })
        .collect();
    doc.txs.extend(rows.iter().cloned());
    Ok(rows)
}

fn account_mut(doc: &mut LedgerDocument, id: AccountId) -> Result<&mut Account> {
    doc.accounts
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or_else(|| LedgerError::NotFound(format!("account {}", id)))
}

fn demote_funding(doc: &mut LedgerDocument) {
    for account in doc.accounts.iter_mut().filter(|a| a.role == AccountRole::Funding) {
        account.role = AccountRole::Unused;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(n: u64) -> String {
        format!("0x{:040x}", n)
    }

    fn new_account(n: u64, role: AccountRole) -> NewAccount {
        NewAccount {
            address: address(n),
            role,
            encrypted_key: format!("key-{}", n),
        }
    }

    #[test]
    fn fresh_store_is_clean_and_current() {
        let store = LedgerStore::in_memory();
        assert_eq!(store.migration_version().unwrap(), LATEST_VERSION);
        assert!(!store.is_dirty().unwrap());
        assert!(!store.flush().unwrap());
    }

    #[test]
    fn mutation_marks_dirty_until_flush() {
        let store = LedgerStore::in_memory();
        store.set_auth_cipher("abc").unwrap();
        assert!(store.is_dirty().unwrap());
        assert!(store.flush().unwrap());
        assert!(!store.is_dirty().unwrap());
        assert!(!store.flush().unwrap());
    }

    #[test]
    fn call_ids_strictly_increase() {
        let store = LedgerStore::in_memory();
        let a = store.append_call(NewCall::default()).unwrap();
        let b = store.append_call(NewCall::default()).unwrap();
        assert!(b.id > a.id);
        assert_eq!(store.largest_id(Table::Calls).unwrap(), b.id.value());
    }

    #[test]
    fn txs_require_existing_call() {
        let store = LedgerStore::in_memory();
        let err = store
            .append_txs(vec![NewTx::error(CallId::new(4), AccountId::new(1), "x")])
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownCall(id) if id == CallId::new(4)));
        assert!(store.snapshot().unwrap().txs.is_empty());
    }

    #[test]
    fn latest_tx_is_authoritative_for_retry() {
        let store = LedgerStore::in_memory();
        store
            .add_accounts(vec![
                new_account(1, AccountRole::Transaction),
                new_account(2, AccountRole::Transaction),
            ])
            .unwrap();
        let call = store.append_call(NewCall::default()).unwrap();
        store
            .append_txs(vec![
                NewTx::error(call.id, AccountId::new(1), "boom"),
                NewTx::error(call.id, AccountId::new(2), "boom"),
            ])
            .unwrap();
        store
            .append_txs(vec![NewTx::success(call.id, AccountId::new(1), "ok")])
            .unwrap();

        let ids: Vec<AccountId> = store
            .retry_candidates(call.id)
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![AccountId::new(2)]);
        assert_eq!(store.get_txs_for_call(call.id, true).unwrap().len(), 2);
    }

    #[test]
    fn add_accounts_records_create_call() {
        let store = LedgerStore::in_memory();
        let report = store
            .add_accounts(vec![
                new_account(1, AccountRole::Funding),
                new_account(2, AccountRole::Transaction),
            ])
            .unwrap();
        let call = report.call.unwrap();
        assert_eq!(call.operation_name, "create");
        assert_eq!(call.description.as_deref(), Some("2 accounts"));
        let outcomes = store.latest_outcomes(call.id).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.values().all(|t| t.outcome == TxOutcome::Success));
    }

    #[test]
    fn add_accounts_skips_live_and_restores_purged() {
        let store = LedgerStore::in_memory();
        store
            .add_accounts(vec![
                new_account(1, AccountRole::Transaction),
                new_account(2, AccountRole::Transaction),
            ])
            .unwrap();
        store.purge_accounts(&[AccountId::new(2)]).unwrap();

        let report = store
            .add_accounts(vec![
                new_account(1, AccountRole::Transaction),
                new_account(2, AccountRole::Transaction),
            ])
            .unwrap();
        assert!(report.call.is_none());
        assert_eq!(report.skipped, vec![address(1)]);
        assert_eq!(report.restored.len(), 1);
        assert_eq!(report.restored[0].role, AccountRole::Transaction);
    }

    #[test]
    fn promoting_funding_demotes_previous() {
        let store = LedgerStore::in_memory();
        store
            .add_accounts(vec![
                new_account(1, AccountRole::Funding),
                new_account(2, AccountRole::Transaction),
            ])
            .unwrap();
        store
            .set_account_role(&[AccountId::new(2)], AccountRole::Funding)
            .unwrap();
        let funding = store
            .get_accounts(&AccountFilter::by_role(AccountRole::Funding))
            .unwrap();
        assert_eq!(funding.len(), 1);
        assert_eq!(funding[0].id, AccountId::new(2));
        assert_eq!(
            store.get_accounts(&AccountFilter::by_id(AccountId::new(1))).unwrap()[0].role,
            AccountRole::Unused
        );
    }

    #[test]
    fn purged_account_cannot_take_a_role() {
        let store = LedgerStore::in_memory();
        store
            .add_accounts(vec![new_account(1, AccountRole::Transaction)])
            .unwrap();
        store.set_account_credential(AccountId::new(1), None).unwrap();
        let err = store
            .set_account_role(&[AccountId::new(1)], AccountRole::Transaction)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvariantViolation(_)));
    }

    #[test]
    fn rekey_is_all_or_nothing() {
        let store = LedgerStore::in_memory();
        store
            .add_accounts(vec![
                new_account(1, AccountRole::Transaction),
                new_account(2, AccountRole::Transaction),
            ])
            .unwrap();
        let err = store
            .rekey_credentials("new".into(), |account, _| {
                if account.id == AccountId::new(2) {
                    Err("bad key")
                } else {
                    Ok("rotated".to_string())
                }
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvariantViolation(_)));
        let accounts = store.get_accounts(&AccountFilter::all()).unwrap();
        assert_eq!(accounts[0].encrypted_key.as_deref(), Some("key-1"));

        let n = store
            .rekey_credentials("new".into(), |_, key| {
                Ok::<_, String>(format!("{}-rotated", key))
            })
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.auth_cipher().unwrap(), "new");
    }

    #[test]
    fn network_alias_versions() {
        let store = LedgerStore::in_memory();
        for alias in ["sepolia2", "sepolia3", "mainnet"] {
            store
                .add_network(NewNetwork {
                    alias: alias.to_string(),
                    endpoint: format!("http://{}", alias),
                    chain_id: None,
                    gas_override: None,
                })
                .unwrap();
        }
        assert_eq!(store.get_network("sepolia").unwrap().unwrap().alias, "sepolia3");
        assert_eq!(store.get_network("sepolia2").unwrap().unwrap().alias, "sepolia2");
        assert!(store.get_network("sepolia9").unwrap().is_none());
        assert_eq!(store.get_network("mainnet").unwrap().unwrap().alias, "mainnet");
    }

    #[test]
    fn duplicate_network_alias_conflicts() {
        let store = LedgerStore::in_memory();
        let new = NewNetwork {
            alias: "local".into(),
            endpoint: "http://localhost:8545".into(),
            chain_id: Some(31337),
            gas_override: None,
        };
        store.add_network(new.clone()).unwrap();
        assert!(matches!(
            store.add_network(new).unwrap_err(),
            LedgerError::Conflict(_)
        ));
        let updated = store
            .update_network(
                "local",
                NetworkUpdate {
                    gas_override: Some(5),
                    ..NetworkUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.gas_override, Some(5));
        assert!(store.remove_network("local").unwrap());
        assert!(!store.remove_network("local").unwrap());
    }
}

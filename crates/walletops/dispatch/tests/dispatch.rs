//! End-to-end dispatch runs against an in-memory chain and ledger.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use walletops_dispatch::{
    BatchDispatcher, DispatchError, DispatchRequest, FundingSelection, RetryTarget, Severity,
    StaticConnector, CREDENTIAL_UNREADABLE, INTERRUPTED, NO_CREDENTIAL,
};
use walletops_ledger::{InMemoryBackend, LedgerStore, NewAccount, NewCall, NewNetwork, NewTx, Table};
use walletops_ops::builtin::DummyOperation;
use walletops_ops::{InMemoryTransport, OperationRegistry, PasswordSigner, Signer};
use walletops_types::{AccountId, AccountRole, CallId, TxOutcome, WEI_PER_ETHER};

const FUNDING: &str = "0x00000000000000000000000000000000000000f0";

fn address(n: u64) -> String {
    format!("0x{:040x}", n)
}

struct Harness {
    ledger: Arc<LedgerStore>,
    backend: Arc<InMemoryBackend>,
    transport: Arc<InMemoryTransport>,
    dispatcher: BatchDispatcher,
}

fn harness_with(transport: InMemoryTransport, registry: OperationRegistry) -> Harness {
    let backend = Arc::new(InMemoryBackend::new());
    let ledger = Arc::new(LedgerStore::new(backend.clone()));
    ledger
        .add_network(NewNetwork {
            alias: "local".into(),
            endpoint: "http://127.0.0.1:8545".into(),
            chain_id: Some(1337),
            gas_override: None,
        })
        .unwrap();
    let transport = Arc::new(transport);
    let dispatcher = BatchDispatcher::new(
        Arc::new(registry),
        ledger.clone(),
        Arc::new(PasswordSigner::new("pw")),
        Arc::new(StaticConnector::new(transport.clone())),
    );
    Harness {
        ledger,
        backend,
        transport,
        dispatcher,
    }
}

fn harness(transport: InMemoryTransport) -> Harness {
    harness_with(transport, OperationRegistry::with_defaults())
}

/// Adds a funding account (id 1) when `funding` is set, then `count`
/// transaction accounts.
fn seed_accounts(ledger: &LedgerStore, funding: bool, count: u64) {
    let signer = PasswordSigner::new("pw");
    let mut accounts = Vec::new();
    if funding {
        accounts.push(NewAccount {
            address: FUNDING.into(),
            role: AccountRole::Funding,
            encrypted_key: signer.sign("funding-key").unwrap(),
        });
    }
    for n in 1..=count {
        accounts.push(NewAccount {
            address: address(n),
            role: AccountRole::Transaction,
            encrypted_key: signer.sign(&format!("key-{}", n)).unwrap(),
        });
    }
    ledger.add_accounts(accounts).unwrap();
}

#[tokio::test]
async fn fresh_run_appends_one_call_and_flushes_once() {
    let h = harness(InMemoryTransport::new().with_balance(&address(1), WEI_PER_ETHER / 4));
    seed_accounts(&h.ledger, true, 3);
    let before = h.ledger.largest_id(Table::Calls).unwrap();

    let summary = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local"))
        .await
        .unwrap();

    assert_eq!(summary.call_id, CallId::new(before + 1));
    assert!(!summary.retry);
    assert_eq!(summary.outcomes.len(), 3);
    assert!(summary.is_clean());
    assert_eq!(summary.outcomes[0].detail.as_deref(), Some("0.25"));
    assert_eq!(h.ledger.get_calls(None).unwrap().len() as u64, before + 1);
    assert_eq!(h.backend.write_count(), 1);
    assert!(!h.ledger.is_dirty().unwrap());

    let call = h.ledger.get_call(summary.call_id).unwrap().unwrap();
    assert_eq!(call.operation_name, "balance");
    assert_eq!(call.raw_args.as_deref(), Some(""));
}

#[tokio::test]
async fn funding_selection_picks_roles() {
    let h = harness(InMemoryTransport::new());
    seed_accounts(&h.ledger, true, 2);

    let only = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local").with_funding(FundingSelection::Only))
        .await
        .unwrap();
    assert_eq!(only.outcomes.len(), 1);
    assert_eq!(only.outcomes[0].account_id, AccountId::new(1));

    let all = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local").with_funding(FundingSelection::Include))
        .await
        .unwrap();
    assert_eq!(all.outcomes.len(), 3);
}

#[tokio::test]
async fn retry_selects_only_latest_errors() {
    let h = harness(InMemoryTransport::new());
    seed_accounts(&h.ledger, true, 9);
    let mut call = None;
    while h.ledger.largest_id(Table::Calls).unwrap() < 7 {
        call = Some(
            h.ledger
                .append_call(NewCall {
                    operation_name: "balance".into(),
                    raw_args: Some(String::new()),
                    ..NewCall::default()
                })
                .unwrap(),
        );
    }
    let call = call.unwrap().id;
    assert_eq!(call, CallId::new(7));
    h.ledger
        .append_txs(vec![
            NewTx::error(call, AccountId::new(9), "timeout"),
            NewTx::error(call, AccountId::new(3), "nonce too low"),
            NewTx::success(call, AccountId::new(4), "0"),
            NewTx::error(call, AccountId::new(5), "nonce too low"),
            NewTx::success(call, AccountId::new(9), "0"),
        ])
        .unwrap();

    let summary = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local").retry(RetryTarget::Call(call)))
        .await
        .unwrap();
    assert!(summary.retry);
    assert_eq!(summary.call_id, call);
    let retried: Vec<AccountId> = summary.outcomes.iter().map(|o| o.account_id).collect();
    assert_eq!(retried, vec![AccountId::new(3), AccountId::new(5)]);
    assert!(summary.is_clean());
    assert_eq!(h.ledger.largest_id(Table::Calls).unwrap(), 7);

    let err = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local").retry(RetryTarget::Latest))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::NothingToRetry(id) if id == call));
    assert_eq!(err.severity(), Severity::Safe);

    let err = h
        .dispatcher
        .dispatch(DispatchRequest::new("dummy", "local").retry(RetryTarget::Call(call)))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::RetryMismatch { .. }));
}

#[tokio::test]
async fn failed_attempts_are_recorded_and_retried() {
    let h = harness(
        InMemoryTransport::new()
            .with_balance(&address(1), 2 * WEI_PER_ETHER)
            .with_balance(&address(2), 2 * WEI_PER_ETHER)
            .failing_sender(&address(2)),
    );
    seed_accounts(&h.ledger, true, 2);
    let sink = address(0xee);

    let summary = h
        .dispatcher
        .dispatch(DispatchRequest::new("drain", "local").with_args(format!("{} --upto 1", sink)))
        .await
        .unwrap();
    assert_eq!(summary.successes(), 1);
    assert_eq!(summary.failures(), 1);
    let failed = &summary.outcomes[1];
    assert_eq!(failed.account_id, AccountId::new(3));
    assert!(failed.detail.as_deref().unwrap_or_default().contains("nonce too low"));

    let candidates = h.ledger.retry_candidates(summary.call_id).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, AccountId::new(3));
}

#[tokio::test]
async fn purged_account_is_recorded_without_running() {
    let h = harness(InMemoryTransport::new());
    seed_accounts(&h.ledger, true, 3);
    let call = h
        .ledger
        .append_call(NewCall {
            operation_name: "balance".into(),
            raw_args: Some(String::new()),
            ..NewCall::default()
        })
        .unwrap()
        .id;
    h.ledger
        .append_txs((2..=4).map(|id| NewTx::error(call, AccountId::new(id), "timeout")).collect())
        .unwrap();
    // purged between the failed run and its retry
    h.ledger.purge_accounts(&[AccountId::new(3)]).unwrap();

    let summary = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local").retry(RetryTarget::Call(call)))
        .await
        .unwrap();
    assert_eq!(summary.outcomes.len(), 3);
    let skipped = &summary.outcomes[1];
    assert_eq!(skipped.account_id, AccountId::new(3));
    assert_eq!(skipped.outcome, TxOutcome::Error);
    assert_eq!(skipped.detail.as_deref(), Some(NO_CREDENTIAL));
    assert_eq!(summary.successes(), 2);
}

#[tokio::test]
async fn undecryptable_credential_fails_only_that_account() {
    let h = harness(InMemoryTransport::new());
    seed_accounts(&h.ledger, true, 3);
    h.ledger
        .set_account_credential(AccountId::new(3), Some("not-a-valid-ciphertext".into()))
        .unwrap();

    let summary = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local"))
        .await
        .unwrap();
    assert_eq!(summary.outcomes.len(), 3);
    assert_eq!(summary.successes(), 2);
    let broken = &summary.outcomes[1];
    assert_eq!(broken.account_id, AccountId::new(3));
    assert_eq!(broken.outcome, TxOutcome::Error);
    assert!(broken
        .detail
        .as_deref()
        .unwrap_or_default()
        .starts_with(CREDENTIAL_UNREADABLE));

    let candidates = h.ledger.retry_candidates(summary.call_id).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, AccountId::new(3));
}

#[tokio::test]
async fn every_run_requires_a_funding_account() {
    let h = harness(InMemoryTransport::new());
    seed_accounts(&h.ledger, false, 2);
    let calls = h.ledger.get_calls(None).unwrap().len();

    let err = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::NoFundingAccount));
    assert_eq!(err.severity(), Severity::Safe);
    assert_eq!(h.ledger.get_calls(None).unwrap().len(), calls);
    assert_eq!(h.backend.write_count(), 0);

    // a purged funding account is demoted, so it no longer counts
    seed_accounts(&h.ledger, true, 0);
    h.ledger.purge_accounts(&[AccountId::new(3)]).unwrap();
    let err = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::NoFundingAccount));

    h.ledger
        .set_account_role(&[AccountId::new(1)], AccountRole::Funding)
        .unwrap();
    h.ledger
        .set_account_credential(AccountId::new(1), Some("not-a-valid-ciphertext".into()))
        .unwrap();
    let calls = h.ledger.get_calls(None).unwrap().len();
    let err = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::CredentialUnreadable { .. }));
    assert_eq!(h.ledger.get_calls(None).unwrap().len(), calls);
}

#[tokio::test]
async fn concurrent_fund_submissions_never_overlap() {
    let h = harness(
        InMemoryTransport::new()
            .with_balance(FUNDING, 100 * WEI_PER_ETHER)
            .with_latency(Duration::from_millis(10)),
    );
    seed_accounts(&h.ledger, true, 5);

    let summary = h
        .dispatcher
        .dispatch(DispatchRequest::new("fund", "local").with_args("1"))
        .await
        .unwrap();
    assert!(summary.is_clean());
    assert_eq!(summary.outcomes.len(), 5);

    let windows = h.transport.submissions();
    assert_eq!(windows.len(), 5);
    for (i, a) in windows.iter().enumerate() {
        for b in windows.iter().skip(i + 1) {
            assert!(!a.overlaps(b));
        }
    }
    assert_eq!(h.transport.balance_of(None, FUNDING), 95 * WEI_PER_ETHER);
}

#[tokio::test]
async fn fund_without_funding_account_changes_nothing() {
    let h = harness(InMemoryTransport::new());
    seed_accounts(&h.ledger, false, 2);
    let calls = h.ledger.get_calls(None).unwrap().len();

    let err = h
        .dispatcher
        .dispatch(DispatchRequest::new("fund", "local").with_args("1"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::NoFundingAccount));
    assert_eq!(h.ledger.get_calls(None).unwrap().len(), calls);
    assert_eq!(h.backend.write_count(), 0);
}

#[tokio::test]
async fn unreachable_network_is_critical_and_writes_nothing() {
    let h = harness(InMemoryTransport::new().unreachable());
    seed_accounts(&h.ledger, false, 2);
    let calls = h.ledger.get_calls(None).unwrap().len();

    let err = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "local"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.severity(), Severity::Critical);
    assert_eq!(h.ledger.get_calls(None).unwrap().len(), calls);
    assert_eq!(h.backend.write_count(), 0);
}

#[tokio::test]
async fn bad_arguments_and_unknown_names_are_safe() {
    let h = harness(InMemoryTransport::new());
    seed_accounts(&h.ledger, false, 1);

    let err = h
        .dispatcher
        .dispatch(DispatchRequest::new("mint", "local"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::UnknownOperation(_)));

    let err = h
        .dispatcher
        .dispatch(DispatchRequest::new("fund", "local").with_args("lots"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::InvalidArgs(_)));

    let err = h
        .dispatcher
        .dispatch(DispatchRequest::new("balance", "mainnet"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, DispatchError::UnknownNetwork(_)));
    assert_eq!(h.backend.write_count(), 0);
}

#[tokio::test]
async fn termination_records_pending_attempts_once() {
    let mut registry = OperationRegistry::with_defaults();
    registry.register(Arc::new(DummyOperation::with_range(
        Duration::from_secs(5),
        Duration::from_secs(6),
    )));
    let h = harness_with(InMemoryTransport::new(), registry);
    seed_accounts(&h.ledger, true, 3);

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = tx.send(());
    });
    let err = h
        .dispatcher
        .dispatch_until(DispatchRequest::new("dummy", "local"), async {
            let _ = rx.await;
        })
        .await
        .err()
        .unwrap();

    let (call_id, pending) = match err {
        DispatchError::Interrupted { call_id, pending } => (call_id, pending),
        other => panic!("expected interruption, got {other}"),
    };
    assert_eq!(pending, 3);
    assert_eq!(h.backend.write_count(), 1);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let txs = h.ledger.get_txs_for_call(call_id, false).unwrap();
    assert_eq!(txs.len(), 3);
    assert!(txs
        .iter()
        .all(|t| t.outcome == TxOutcome::Error && t.detail.as_deref() == Some(INTERRUPTED)));
    assert_eq!(h.ledger.retry_candidates(call_id).unwrap().len(), 3);
}

#[tokio::test]
async fn termination_before_any_task_runs_keeps_every_account() {
    let mut registry = OperationRegistry::with_defaults();
    registry.register(Arc::new(DummyOperation::with_range(
        Duration::from_secs(5),
        Duration::from_secs(6),
    )));
    let h = harness_with(InMemoryTransport::new(), registry);
    seed_accounts(&h.ledger, true, 3);

    let err = h
        .dispatcher
        .dispatch_until(DispatchRequest::new("dummy", "local"), async {})
        .await
        .err()
        .unwrap();
    let (call_id, pending) = match err {
        DispatchError::Interrupted { call_id, pending } => (call_id, pending),
        other => panic!("expected interruption, got {other}"),
    };
    assert_eq!(pending, 3);
    assert_eq!(h.backend.write_count(), 1);

    let txs = h.ledger.get_txs_for_call(call_id, false).unwrap();
    assert_eq!(txs.len(), 3);
    assert!(txs
        .iter()
        .all(|t| t.outcome == TxOutcome::Error && t.detail.as_deref() == Some(INTERRUPTED)));

    let retry: Vec<AccountId> = h
        .ledger
        .retry_candidates(call_id)
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(retry, vec![AccountId::new(2), AccountId::new(3), AccountId::new(4)]);
}

#[tokio::test]
async fn file_ledger_survives_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let ledger = Arc::new(LedgerStore::open(&path));
    ledger
        .add_network(NewNetwork {
            alias: "local".into(),
            endpoint: "http://127.0.0.1:8545".into(),
            chain_id: None,
            gas_override: None,
        })
        .unwrap();
    seed_accounts(&ledger, true, 2);
    let dispatcher = BatchDispatcher::new(
        Arc::new(OperationRegistry::with_defaults()),
        ledger,
        Arc::new(PasswordSigner::new("pw")),
        Arc::new(StaticConnector::new(Arc::new(InMemoryTransport::new()))),
    );
    let summary = dispatcher
        .dispatch(DispatchRequest::new("balance", "local"))
        .await
        .unwrap();

    let reopened = LedgerStore::open(&path);
    let txs = reopened.get_txs_for_call(summary.call_id, false).unwrap();
    assert_eq!(txs.len(), 2);
    assert_eq!(reopened.get_accounts(&Default::default()).unwrap().len(), 3);
}

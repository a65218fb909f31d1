//! Built-in operations against the in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use walletops_ops::builtin::{ALREADY_SATISFIED, NATIVE_TRANSFER_GAS, NOTHING_TO_DRAIN};
use walletops_ops::{
    FundingAccess, InMemoryTransport, LockRegistry, LogReporter, OperationContext, OperationError,
    OperationRegistry, SigningHandle, Transport,
};
use walletops_types::{AccountId, WEI_PER_ETHER};
use zeroize::Zeroizing;

const FUNDING: &str = "0x00000000000000000000000000000000000000f0";
const SINK: &str = "0x00000000000000000000000000000000000000ee";

fn address(n: u64) -> String {
    format!("0x{:040x}", n)
}

fn handle(id: u64, address: &str) -> SigningHandle {
    SigningHandle::new(AccountId::new(id), address, Zeroizing::new(format!("key-{}", id)))
}

fn context(
    registry: &OperationRegistry,
    operation: &str,
    raw: &str,
    account: SigningHandle,
    transport: Arc<dyn Transport>,
    funding: Option<FundingAccess>,
) -> OperationContext {
    let args = registry.lookup(operation).unwrap().parse(raw).unwrap();
    let ctx = OperationContext::new(account, transport, 1, args, Arc::new(LogReporter));
    match funding {
        Some(f) => ctx.with_funding(f),
        None => ctx,
    }
}

#[tokio::test]
async fn concurrent_funding_never_overlaps() {
    let registry = OperationRegistry::with_defaults();
    let transport = Arc::new(
        InMemoryTransport::new()
            .with_balance(FUNDING, 100 * WEI_PER_ETHER)
            .with_latency(Duration::from_millis(15)),
    );
    let locks = Arc::new(LockRegistry::new());
    let access = FundingAccess::new(Arc::new(handle(1, FUNDING)), locks, "fund");
    let fund = registry.lookup("fund").unwrap();

    let mut tasks = Vec::new();
    for n in 2..8u64 {
        let ctx = context(
            &registry,
            "fund",
            "1",
            handle(n, &address(n)),
            transport.clone(),
            Some(access.clone()),
        );
        let fund = fund.clone();
        tasks.push(tokio::spawn(async move { fund.run(&ctx).await }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let windows = transport.submissions();
    assert_eq!(windows.len(), 6);
    for (i, a) in windows.iter().enumerate() {
        for b in windows.iter().skip(i + 1) {
            assert!(!a.overlaps(b), "funding submissions overlapped");
        }
    }
    assert_eq!(transport.balance_of(None, FUNDING), 94 * WEI_PER_ETHER);
}

#[tokio::test]
async fn fund_upto_skips_satisfied_accounts() {
    let registry = OperationRegistry::with_defaults();
    let target = address(2);
    let transport = Arc::new(
        InMemoryTransport::new()
            .with_balance(FUNDING, 10 * WEI_PER_ETHER)
            .with_balance(&target, 2 * WEI_PER_ETHER),
    );
    let access = FundingAccess::new(
        Arc::new(handle(1, FUNDING)),
        Arc::new(LockRegistry::new()),
        "fund",
    );
    let ctx = context(&registry, "fund", "2 --upto", handle(2, &target), transport.clone(), Some(access.clone()));
    let out = registry.lookup("fund").unwrap().run(&ctx).await.unwrap();
    assert_eq!(out, ALREADY_SATISFIED);
    assert!(transport.submissions().is_empty());

    let ctx = context(&registry, "fund", "3 --upto", handle(2, &target), transport.clone(), Some(access));
    registry.lookup("fund").unwrap().run(&ctx).await.unwrap();
    assert_eq!(transport.balance_of(None, &target), 3 * WEI_PER_ETHER);
}

#[tokio::test]
async fn fund_without_funding_access_fails() {
    let registry = OperationRegistry::with_defaults();
    let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new());
    let ctx = context(&registry, "fund", "1", handle(2, &address(2)), transport, None);
    let err = registry.lookup("fund").unwrap().run(&ctx).await.unwrap_err();
    assert!(matches!(err, OperationError::FundingUnavailable(_)));
}

#[tokio::test]
async fn drain_leaves_upto_and_pays_fee() {
    let registry = OperationRegistry::with_defaults();
    let source = address(3);
    let transport = Arc::new(InMemoryTransport::new().with_balance(&source, 5 * WEI_PER_ETHER));
    let ctx = context(
        &registry,
        "drain",
        &format!("{} --upto 1", SINK),
        handle(3, &source),
        transport.clone(),
        None,
    );
    registry.lookup("drain").unwrap().run(&ctx).await.unwrap();
    assert_eq!(
        transport.balance_of(None, SINK),
        4 * WEI_PER_ETHER - NATIVE_TRANSFER_GAS
    );
}

#[tokio::test]
async fn drain_empty_account_is_a_no_op() {
    let registry = OperationRegistry::with_defaults();
    let transport = Arc::new(InMemoryTransport::new());
    let ctx = context(&registry, "drain", SINK, handle(4, &address(4)), transport.clone(), None);
    let out = registry.lookup("drain").unwrap().run(&ctx).await.unwrap();
    assert_eq!(out, NOTHING_TO_DRAIN);
}

#[tokio::test]
async fn balance_reports_ether() {
    let registry = OperationRegistry::with_defaults();
    let account = address(5);
    let transport = Arc::new(InMemoryTransport::new().with_balance(&account, WEI_PER_ETHER / 4));
    let ctx = context(&registry, "balance", "", handle(5, &account), transport, None);
    let out = registry.lookup("balance").unwrap().run(&ctx).await.unwrap();
    assert_eq!(out, "0.25");
}

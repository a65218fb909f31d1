//! Batch dispatcher.
//!
//! Resolves an operation, a network, the funding account and a target set,
//! then runs the operation once per account on its own task. Outcomes land
//! in the ledger through the [`CrashGuard`], which is flushed once per run.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;
use walletops_ledger::{LedgerStore, NewCall, NewTx};
use walletops_ops::{
    FundingAccess, LockRegistry, LogReporter, Operation, OperationContext, OperationRegistry,
    ProgressReporter, ResourceClass, Signer, SigningHandle,
};
use walletops_types::{Account, AccountFilter, AccountId, AccountRole, Amount, Call, CallId};

use crate::error::{DispatchError, Result};
use crate::guard::CrashGuard;
use crate::resolver::{Connector, CredentialResolver};
use crate::summary::RunSummary;

/// Detail recorded for accounts whose credential was purged.
pub const NO_CREDENTIAL: &str = "no credential";

/// Detail prefix recorded for accounts whose credential fails to decrypt.
pub const CREDENTIAL_UNREADABLE: &str = "credential unreadable";

/// Detail recorded when an operation succeeds without output.
const SUCCESS: &str = "success";

/// Detail recorded for attempts whose task ended without settling.
const ABANDONED: &str = "task aborted";

/// Which recorded call a retry re-runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryTarget {
    /// Most recent call of the requested operation.
    Latest,
    Call(CallId),
}

/// Whether a fresh run includes the funding account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FundingSelection {
    #[default]
    Exclude,
    Include,
    Only,
}

/// One dispatch invocation.
#[derive(Debug, Clone, Default)]
pub struct DispatchRequest {
    pub operation: String,
    pub network: String,
    /// Argument string. A retry without one reuses the recorded arguments.
    pub raw_args: Option<String>,
    pub retry: Option<RetryTarget>,
    pub fee_override: Option<Amount>,
    pub filter: AccountFilter,
    pub funding: FundingSelection,
}

impl DispatchRequest {
    pub fn new(operation: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            network: network.into(),
            ..Self::default()
        }
    }

    pub fn with_args(mut self, raw_args: impl Into<String>) -> Self {
        self.raw_args = Some(raw_args.into());
        self
    }

    pub fn retry(mut self, target: RetryTarget) -> Self {
        self.retry = Some(target);
        self
    }

    pub fn with_fee_override(mut self, fee_rate: Amount) -> Self {
        self.fee_override = Some(fee_rate);
        self
    }

    pub fn with_filter(mut self, filter: AccountFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_funding(mut self, funding: FundingSelection) -> Self {
        self.funding = funding;
        self
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    ResolvingOperation,
    ResolvingNetwork,
    ResolvingFunding,
    ResolvingTargets,
    Executing,
    Flushing,
    Done,
    Failed,
}

fn advance(state: &mut DispatchState, next: DispatchState) {
    debug!(from = ?*state, to = ?next, "dispatch state");
    *state = next;
}

/// Runs operations across accounts and records every attempt.
pub struct BatchDispatcher {
    registry: Arc<OperationRegistry>,
    ledger: Arc<LedgerStore>,
    resolver: CredentialResolver,
    locks: Arc<LockRegistry>,
    reporter: Arc<dyn ProgressReporter>,
}

impl BatchDispatcher {
    pub fn new(
        registry: Arc<OperationRegistry>,
        ledger: Arc<LedgerStore>,
        signer: Arc<dyn Signer>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let resolver = CredentialResolver::new(ledger.clone(), signer, connector);
        Self {
            registry,
            ledger,
            resolver,
            locks: Arc::new(LockRegistry::new()),
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn ledger(&self) -> &Arc<LedgerStore> {
        &self.ledger
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Run to completion.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<RunSummary> {
        self.dispatch_until(request, futures::future::pending::<()>())
            .await
    }

    /// Run until done or until `terminate` resolves, whichever comes first.
    ///
    /// On termination every attempt still in flight is recorded as an error,
    /// the ledger is flushed and [`DispatchError::Interrupted`] is returned.
    pub async fn dispatch_until<F>(&self, request: DispatchRequest, terminate: F) -> Result<RunSummary>
    where
        F: Future<Output = ()> + Send,
    {
        let span = info_span!(
            "dispatch",
            run = %Uuid::new_v4(),
            operation = %request.operation,
            network = %request.network,
        );
        let mut state = DispatchState::Idle;
        let result = self
            .execute(&request, terminate, &mut state)
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        match &result {
            Ok(summary) => {
                advance(&mut state, DispatchState::Done);
                info!(
                    call_id = %summary.call_id,
                    succeeded = summary.successes(),
                    failed = summary.failures(),
                    "dispatch finished"
                );
            }
            Err(e) => {
                let failed_in = state;
                advance(&mut state, DispatchState::Failed);
                warn!(state = ?failed_in, severity = ?e.severity(), error = %e, "dispatch failed");
            }
        }
        result
    }

    async fn execute<F>(
        &self,
        request: &DispatchRequest,
        terminate: F,
        state: &mut DispatchState,
    ) -> Result<RunSummary>
    where
        F: Future<Output = ()> + Send,
    {
        advance(state, DispatchState::ResolvingOperation);
        let operation = self.registry.lookup(&request.operation)?;
        let retry_call = match request.retry {
            Some(target) => Some(self.retry_call(target, operation.name())?),
            None => None,
        };
        let raw_args = match (&request.raw_args, &retry_call) {
            (Some(raw), _) => raw.clone(),
            (None, Some(call)) => call.raw_args.clone().unwrap_or_default(),
            (None, None) => String::new(),
        };
        let args = operation.parse(&raw_args)?;

        advance(state, DispatchState::ResolvingNetwork);
        let network = self
            .resolver
            .resolve_network(&request.network, request.fee_override)
            .await?;

        advance(state, DispatchState::ResolvingFunding);
        let funding_handle = self.resolver.resolve_funding()?;
        let funding = match operation.resource_class() {
            ResourceClass::SharedFunding => Some(FundingAccess::new(
                Arc::new(funding_handle),
                self.locks.clone(),
                operation.name(),
            )),
            ResourceClass::Independent => None,
        };

        advance(state, DispatchState::ResolvingTargets);
        let targets = match &retry_call {
            Some(call) => self.retry_targets(call.id, &request.filter)?,
            None => self.fresh_targets(request)?,
        };
        if targets.is_empty() {
            return Err(DispatchError::NoTargets);
        }

        advance(state, DispatchState::Executing);
        let (call_id, retry) = match retry_call {
            Some(call) => (call.id, true),
            None => {
                let call = self.ledger.append_call(NewCall {
                    network_id: Some(network.target.id),
                    operation_name: operation.name().to_string(),
                    description: Some(operation.description().to_string()),
                    raw_args: Some(raw_args),
                })?;
                (call.id, false)
            }
        };
        info!(call_id = %call_id, accounts = targets.len(), retry, fee_rate = %network.fee_rate, "executing");

        let account_ids: Vec<AccountId> = targets.iter().map(|t| t.account_id).collect();
        let guard = Arc::new(CrashGuard::new(self.ledger.clone(), call_id));
        let mut tasks = JoinSet::new();
        // Every target has a row or a placeholder before any task runs.
        for handle in targets {
            let account_id = handle.account_id;
            let mut ctx = OperationContext::new(
                handle,
                network.transport.clone(),
                network.fee_rate,
                args.clone(),
                self.reporter.clone(),
            );
            if let Some(detail) = unavailable_credential(&ctx.account) {
                warn!(call_id = %call_id, account_id = %account_id, detail = %detail, "account skipped");
                ctx.finish(false, &detail);
                guard.record(NewTx::error(call_id, account_id, detail))?;
                continue;
            }
            guard.register(account_id)?;
            if let Some(funding) = &funding {
                ctx = ctx.with_funding(funding.clone());
            }
            tasks.spawn(run_account(operation.clone(), ctx, guard.clone()).instrument(Span::current()));
        }

        tokio::pin!(terminate);
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => error!(call_id = %call_id, error = %e, "account task did not complete"),
                    None => break,
                },
                _ = &mut terminate => {
                    let pending = guard.interrupt()?;
                    tasks.abort_all();
                    self.ledger.flush()?;
                    warn!(call_id = %call_id, pending, "dispatch interrupted");
                    return Err(DispatchError::Interrupted { call_id, pending });
                }
            }
        }

        let abandoned = guard.drain(ABANDONED)?;
        if abandoned > 0 {
            error!(call_id = %call_id, abandoned, "attempts ended without an outcome");
        }

        advance(state, DispatchState::Flushing);
        self.ledger.flush()?;
        RunSummary::from_ledger(&self.ledger, call_id, operation.name(), retry, &account_ids)
    }

    fn retry_call(&self, target: RetryTarget, operation: &str) -> Result<Call> {
        let call = match target {
            RetryTarget::Call(id) => self
                .ledger
                .get_call(id)?
                .ok_or(DispatchError::UnknownCall(id))?,
            RetryTarget::Latest => {
                let calls = self.ledger.get_calls(None)?;
                if calls.is_empty() {
                    return Err(DispatchError::NoCalls);
                }
                calls
                    .into_iter()
                    .filter(|c| c.operation_name == operation)
                    .max_by_key(|c| c.id)
                    .ok_or(DispatchError::NoCalls)?
            }
        };
        if call.operation_name != operation {
            return Err(DispatchError::RetryMismatch {
                call: call.id,
                recorded: call.operation_name,
                requested: operation.to_string(),
            });
        }
        Ok(call)
    }

    fn retry_targets(&self, call_id: CallId, filter: &AccountFilter) -> Result<Vec<SigningHandle>> {
        let candidates = self.ledger.retry_candidates(call_id)?;
        if candidates.is_empty() {
            return Err(DispatchError::NothingToRetry(call_id));
        }
        let selected = filter.apply(&candidates);
        debug!(call_id = %call_id, candidates = candidates.len(), selected = selected.len(), "retry selection");
        self.resolver.bind_all(&selected)
    }

    fn fresh_targets(&self, request: &DispatchRequest) -> Result<Vec<SigningHandle>> {
        if request.filter.role.is_some() {
            return self.resolver.resolve_targets(&request.filter);
        }
        let wanted: &[AccountRole] = match request.funding {
            FundingSelection::Exclude => &[AccountRole::Transaction],
            FundingSelection::Only => &[AccountRole::Funding],
            FundingSelection::Include => &[AccountRole::Transaction, AccountRole::Funding],
        };
        let accounts: Vec<Account> = self
            .ledger
            .get_accounts(&request.filter)?
            .into_iter()
            .filter(|a| wanted.contains(&a.role))
            .collect();
        self.resolver.bind_all(&accounts)
    }
}

/// Error detail for a target that cannot sign, if any.
fn unavailable_credential(account: &SigningHandle) -> Option<String> {
    if account.has_credential() {
        return None;
    }
    Some(match account.unreadable_reason() {
        Some(reason) => format!("{}: {}", CREDENTIAL_UNREADABLE, reason),
        None => NO_CREDENTIAL.to_string(),
    })
}

/// Run one registered attempt and settle its placeholder.
async fn run_account(operation: Arc<dyn Operation>, ctx: OperationContext, guard: Arc<CrashGuard>) {
    let call_id = guard.call_id();
    let account_id = ctx.account.account_id;

    ctx.report("started");
    let tx = match operation.run(&ctx).await {
        Ok(output) => {
            let detail = if output.is_empty() {
                SUCCESS.to_string()
            } else {
                output
            };
            debug!(call_id = %call_id, account_id = %account_id, detail = %detail, "attempt succeeded");
            ctx.finish(true, &detail);
            NewTx::success(call_id, account_id, detail)
        }
        Err(e) => {
            let detail = e.to_string();
            warn!(call_id = %call_id, account_id = %account_id, error = %detail, "attempt failed");
            ctx.finish(false, &detail);
            NewTx::error(call_id, account_id, detail)
        }
    };

    if let Err(e) = guard.settle(tx) {
        error!(call_id = %call_id, account_id = %account_id, error = %e, "failed to record outcome");
    }
}

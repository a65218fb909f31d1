//! Operation trait and the per-account execution context.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use walletops_types::Amount;

use crate::capability::{ProgressReporter, SigningHandle, Transport};
use crate::error::{OperationError, Result};
use crate::lock::{LockRegistry, NamedGuard};

/// Parsed operation arguments, shared by every task of one run.
pub type OperationArgs = Arc<dyn Any + Send + Sync>;

/// Which external state an operation mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    /// Only touches the account it runs for.
    Independent,
    /// Draws from the single funding account. Submissions from it must be
    /// serialized.
    SharedFunding,
}

/// A statically registered batch operation.
#[async_trait]
pub trait Operation: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Usage text for the argument string.
    fn help(&self) -> String;

    fn resource_class(&self) -> ResourceClass {
        ResourceClass::Independent
    }

    /// Parse the free-form argument string. Pure.
    fn parse(&self, raw: &str) -> Result<OperationArgs>;

    /// Run for one account. The returned text is recorded as the tx detail.
    async fn run(&self, ctx: &OperationContext) -> Result<String>;
}

/// Funding account plus the lock guarding it.
#[derive(Clone)]
pub struct FundingAccess {
    handle: Arc<SigningHandle>,
    locks: Arc<LockRegistry>,
    lock_name: String,
}

impl FundingAccess {
    pub fn new(handle: Arc<SigningHandle>, locks: Arc<LockRegistry>, lock_name: impl Into<String>) -> Self {
        Self {
            handle,
            locks,
            lock_name: lock_name.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.handle.address
    }
}

/// Exclusive access to the funding account. Dropping it releases the lock.
pub struct FundingPermit<'a> {
    handle: &'a SigningHandle,
    _guard: NamedGuard,
}

impl FundingPermit<'_> {
    pub fn handle(&self) -> &SigningHandle {
        self.handle
    }
}

/// Everything one account's task can reach.
pub struct OperationContext {
    pub account: SigningHandle,
    pub transport: Arc<dyn Transport>,
    pub fee_rate: Amount,
    args: OperationArgs,
    reporter: Arc<dyn ProgressReporter>,
    funding: Option<FundingAccess>,
    label: String,
}

impl OperationContext {
    pub fn new(
        account: SigningHandle,
        transport: Arc<dyn Transport>,
        fee_rate: Amount,
        args: OperationArgs,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        let label = account.label();
        Self {
            account,
            transport,
            fee_rate,
            args,
            reporter,
            funding: None,
            label,
        }
    }

    pub fn with_funding(mut self, funding: FundingAccess) -> Self {
        self.funding = Some(funding);
        self
    }

    /// Typed view of the parsed arguments.
    pub fn args<T: Any + Send + Sync>(&self, operation: &str) -> Result<&T> {
        self.args
            .downcast_ref::<T>()
            .ok_or_else(|| OperationError::ArgsMismatch(operation.to_string()))
    }

    pub fn report(&self, message: &str) {
        self.reporter.report(&self.label, message);
    }

    pub fn finish(&self, success: bool, message: &str) {
        self.reporter.finish(&self.label, success, message);
    }

    pub fn funding_address(&self) -> Option<&str> {
        self.funding.as_ref().map(FundingAccess::address)
    }

    /// Wait for the funding lock and return the funding handle under it.
    ///
    /// Reports `waiting` before and `running` after acquisition.
    pub async fn acquire_funding(&self, operation: &str) -> Result<FundingPermit<'_>> {
        let funding = self
            .funding
            .as_ref()
            .ok_or_else(|| OperationError::FundingUnavailable(operation.to_string()))?;
        self.report("waiting");
        let guard = funding.locks.acquire(&funding.lock_name).await?;
        self.report("running");
        Ok(FundingPermit {
            handle: &funding.handle,
            _guard: guard,
        })
    }
}

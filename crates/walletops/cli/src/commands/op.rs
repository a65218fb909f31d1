//! `wops op`: run an operation across accounts.

use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tracing::{info, warn};
use walletops_dispatch::{
    BatchDispatcher, DispatchRequest, FundingSelection, JsonRpcConnector, RetryTarget, RunSummary,
};
use walletops_ops::{OperationRegistry, ResourceClass};
use walletops_types::CallId;

use super::{parse_gwei, FilterArgs, Session};
use crate::auth;
use crate::error::{CliError, CliResult};
use crate::output::{self, print_success, print_warning};
use crate::progress::SpinnerReporter;

#[derive(Args, Debug)]
pub struct OpArgs {
    /// Operation name
    #[arg(required_unless_present = "list")]
    pub operation: Option<String>,

    /// Network alias (defaults to the configured network)
    pub network: Option<String>,

    /// Operation arguments, quoted as one string
    #[arg(allow_hyphen_values = true)]
    pub args: Option<String>,

    /// Re-run failed accounts of a call. Without an id, the latest call of
    /// this operation is used; an explicit id must be a call of this operation
    #[arg(long, num_args = 0..=1, default_missing_value = "latest")]
    pub retry: Option<String>,

    /// Fee rate in gwei, overriding the network
    #[arg(long)]
    pub gas_override: Option<String>,

    /// Include the funding account
    #[arg(long, conflicts_with = "only_funding")]
    pub with_funding: bool,

    /// Run only for the funding account
    #[arg(long)]
    pub only_funding: bool,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// List the available operations
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct OperationRow {
    name: String,
    funding: String,
    description: String,
}

#[derive(Debug, Serialize, Tabled)]
struct OutcomeRow {
    account: String,
    tx: String,
    outcome: String,
    detail: String,
}

fn parse_retry(raw: &str) -> CliResult<RetryTarget> {
    if raw == "latest" {
        return Ok(RetryTarget::Latest);
    }
    raw.parse::<u64>()
        .map(|id| RetryTarget::Call(CallId::new(id)))
        .map_err(|_| CliError::InvalidInput(format!("retry expects a call id, got \"{}\"", raw)))
}

impl OpArgs {
    fn request(&self, operation: String, network: String) -> CliResult<DispatchRequest> {
        let funding = if self.only_funding {
            FundingSelection::Only
        } else if self.with_funding {
            FundingSelection::Include
        } else {
            FundingSelection::Exclude
        };
        let mut request = DispatchRequest::new(operation, network)
            .with_filter(self.filter.to_filter())
            .with_funding(funding);
        if let Some(raw) = &self.args {
            request = request.with_args(raw.clone());
        }
        if let Some(retry) = &self.retry {
            request = request.retry(parse_retry(retry)?);
        }
        if let Some(gwei) = &self.gas_override {
            request = request.with_fee_override(parse_gwei(gwei)?);
        }
        Ok(request)
    }
}

fn list_operations(registry: &OperationRegistry, session: &Session) -> CliResult<()> {
    let rows: Vec<OperationRow> = registry
        .list()
        .into_iter()
        .map(|op| OperationRow {
            name: op.name().to_string(),
            funding: match op.resource_class() {
                ResourceClass::SharedFunding => "shared".to_string(),
                ResourceClass::Independent => "-".to_string(),
            },
            description: op.description().to_string(),
        })
        .collect();
    output::print_output(rows, session.format)
}

fn print_summary(summary: &RunSummary, session: &Session) -> CliResult<()> {
    let rows: Vec<OutcomeRow> = summary
        .outcomes
        .iter()
        .map(|o| OutcomeRow {
            account: o.account_id.to_string(),
            tx: o.tx_id.to_string(),
            outcome: o.outcome.to_string(),
            detail: o.detail.clone().unwrap_or_default(),
        })
        .collect();
    output::print_output(rows, session.format)?;

    let line = format!(
        "{} {}: {} succeeded, {} failed",
        summary.operation,
        summary.call_id,
        summary.successes(),
        summary.failures()
    );
    if summary.is_clean() {
        print_success(&line);
    } else {
        print_warning(&format!("{} (retry with --retry {})", line, summary.call_id.value()));
    }
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, stopping run");
        }
        _ = terminate => {
            info!("received terminate signal, stopping run");
        }
    }
}

/// Execute `wops op`
pub async fn execute(args: OpArgs, session: &Session) -> CliResult<()> {
    let registry = OperationRegistry::with_defaults();
    if args.list {
        if let Some(name) = &args.operation {
            println!("{}", registry.lookup(name)?.help());
            return Ok(());
        }
        return list_operations(&registry, session);
    }

    let operation = args
        .operation
        .clone()
        .ok_or_else(|| CliError::InvalidInput("operation name required".into()))?;
    let network = args
        .network
        .clone()
        .or_else(|| session.config.default_network.clone())
        .ok_or_else(|| CliError::InvalidInput("network alias required".into()))?;
    let request = args.request(operation, network)?;

    let signer = auth::unlock(&session.ledger)?;
    let connector = JsonRpcConnector {
        request_timeout: session.config.rpc_timeout(),
        poll_interval: session.config.poll_interval(),
    };
    let reporter = Arc::new(SpinnerReporter::new());
    let dispatcher = BatchDispatcher::new(
        Arc::new(registry),
        session.ledger.clone(),
        Arc::new(signer),
        Arc::new(connector),
    )
    .with_reporter(reporter.clone());

    let result = dispatcher
        .dispatch_until(request, termination_signal())
        .await;
    reporter.clear();

    let summary = result?;
    print_summary(&summary, session)
}

//! `wops history`: recorded calls and their outcomes.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use walletops_ledger::LedgerStore;
use walletops_types::{Call, CallId, Tx};

use super::Session;
use crate::error::{CliError, CliResult};
use crate::output;

/// Calls shown when `--all` is not given.
const RECENT_CALLS: usize = 10;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Show every call, not just the most recent ones
    #[arg(long)]
    pub all: bool,

    /// Show the txs of one call
    #[arg(long)]
    pub call: Option<u64>,

    /// With --call, only the latest tx per account
    #[arg(long, requires = "call")]
    pub latest: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct CallRow {
    id: String,
    operation: String,
    args: String,
    succeeded: usize,
    failed: usize,
    created: String,
}

#[derive(Debug, Serialize, Tabled)]
struct TxRow {
    id: String,
    account: String,
    outcome: String,
    detail: String,
    recorded: String,
}

impl From<&Tx> for TxRow {
    fn from(tx: &Tx) -> Self {
        Self {
            id: tx.id.to_string(),
            account: tx.account_id.to_string(),
            outcome: tx.outcome.to_string(),
            detail: tx.detail.clone().unwrap_or_default(),
            recorded: tx.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

fn call_row(ledger: &LedgerStore, call: Call) -> CliResult<CallRow> {
    let latest = ledger.latest_outcomes(call.id)?;
    let failed = latest.values().filter(|tx| tx.outcome.is_error()).count();
    Ok(CallRow {
        id: call.id.to_string(),
        operation: call.operation_name,
        args: call.raw_args.unwrap_or_default(),
        succeeded: latest.len() - failed,
        failed,
        created: call.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

/// Execute `wops history`
pub fn execute(args: HistoryArgs, session: &Session) -> CliResult<()> {
    let ledger = &session.ledger;

    if let Some(id) = args.call {
        let call_id = CallId::new(id);
        if ledger.get_call(call_id)?.is_none() {
            return Err(CliError::InvalidInput(format!("{} does not exist", call_id)));
        }
        let rows: Vec<TxRow> = if args.latest {
            ledger
                .latest_outcomes(call_id)?
                .values()
                .map(TxRow::from)
                .collect()
        } else {
            ledger
                .get_txs_for_call(call_id, false)?
                .iter()
                .map(TxRow::from)
                .collect()
        };
        return output::print_output(rows, session.format);
    }

    let calls = ledger.get_calls(None)?;
    let skip = if args.all {
        0
    } else {
        calls.len().saturating_sub(RECENT_CALLS)
    };
    let rows = calls
        .into_iter()
        .skip(skip)
        .map(|call| call_row(ledger, call))
        .collect::<CliResult<Vec<_>>>()?;
    output::print_output(rows, session.format)
}

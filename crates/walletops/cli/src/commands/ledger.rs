//! Whole-ledger maintenance: password rotation, purge and info.

use serde::Serialize;
use walletops_ledger::LATEST_VERSION;

use super::Session;
use crate::auth;
use crate::error::CliResult;
use crate::output::{self, print_error, print_success};

#[derive(Debug, Serialize)]
struct LedgerInfo {
    location: String,
    migration_version: u32,
    latest_version: u32,
    accounts: usize,
    networks: usize,
    calls: usize,
    txs: usize,
}

/// Re-encrypt every credential under a new password.
pub fn rekey(session: &Session) -> CliResult<()> {
    let old = auth::unlock(&session.ledger)?;
    let new_password = auth::read_new_password()?;
    let count = auth::rekey_with(&session.ledger, &old, &new_password)?;
    session.ledger.flush()?;
    print_success(&format!("Re-encrypted {} credential(s)", count));
    Ok(())
}

/// Delete the ledger file.
pub fn purge(session: &Session, yes: bool) -> CliResult<()> {
    let location = session.ledger.location();
    if !yes {
        let confirm = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Delete the ledger at {}? Every account and call record is lost.",
                location
            ))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirm {
            print_error("Aborted");
            return Ok(());
        }
    }
    if session.ledger.purge()? {
        print_success(&format!("Deleted {}", location));
    } else {
        print_error(&format!("No ledger at {}", location));
    }
    Ok(())
}

/// Print where the ledger lives and what it holds.
pub fn info(session: &Session) -> CliResult<()> {
    let ledger = &session.ledger;
    let doc = ledger.snapshot()?;
    let info = LedgerInfo {
        location: ledger.location(),
        migration_version: doc.migration_version,
        latest_version: LATEST_VERSION,
        accounts: doc.accounts.len(),
        networks: doc.networks.len(),
        calls: doc.calls.len(),
        txs: doc.txs.len(),
    };
    output::print_single(&info)
}

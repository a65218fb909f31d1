//! `wops account`: manage the account table.

use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use walletops_ledger::NewAccount;
use walletops_ops::Signer;
use walletops_types::{require_address, Account, AccountId, AccountRole};

use super::{FilterArgs, Session};
use crate::auth;
use crate::error::{CliError, CliResult};
use crate::output::{self, print_error, print_info, print_success, short_address};

/// Account subcommands
#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// Add an account with its private key
    Add {
        /// Account address
        address: String,

        /// Private key, stored encrypted
        key: String,

        /// Role of the new account
        #[arg(short, long, default_value = "transaction")]
        role: AccountRole,
    },

    /// List accounts
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Show full addresses
        #[arg(long)]
        wide: bool,
    },

    /// Change the role of selected accounts
    Role {
        /// New role (unused, funding, transaction or u/f/t)
        #[arg(value_name = "ROLE")]
        new_role: AccountRole,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Drop the credential of selected accounts
    Purge {
        #[command(flatten)]
        filter: FilterArgs,

        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Table row for account display
#[derive(Debug, Serialize, Tabled)]
struct AccountRow {
    id: String,
    role: String,
    address: String,
    credential: String,
}

impl AccountRow {
    fn new(account: &Account, wide: bool) -> Self {
        Self {
            id: account.id.value().to_string(),
            role: account.role.to_string(),
            address: if wide {
                account.address.clone()
            } else {
                short_address(&account.address)
            },
            credential: if account.is_purged() {
                "purged".to_string()
            } else {
                "encrypted".to_string()
            },
        }
    }
}

fn selected_ids(session: &Session, filter: &FilterArgs) -> CliResult<Vec<AccountId>> {
    if filter.is_empty() {
        return Err(CliError::InvalidInput(
            "select accounts with --id, --role, --address, --purged or --unpurged".into(),
        ));
    }
    Ok(session
        .ledger
        .get_accounts(&filter.to_filter())?
        .iter()
        .map(|a| a.id)
        .collect())
}

fn confirm(prompt: String) -> bool {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Execute an account command
pub fn execute(command: AccountCommands, session: &Session) -> CliResult<()> {
    let ledger = &session.ledger;
    match command {
        AccountCommands::Add { address, key, role } => {
            require_address(&address)?;
            let signer = auth::unlock(ledger)?;
            let report = ledger.add_accounts(vec![NewAccount {
                address: address.clone(),
                role,
                encrypted_key: signer.sign(&key)?,
            }])?;
            ledger.flush()?;

            if let Some(account) = report.added.first() {
                print_success(&format!("Added {}", account.label()));
            } else if let Some(account) = report.restored.first() {
                print_success(&format!("Restored credential of {}", account.label()));
            } else {
                print_info(&format!("{} is already in the ledger", address));
            }
            Ok(())
        }

        AccountCommands::List { filter, wide } => {
            let rows: Vec<AccountRow> = ledger
                .get_accounts(&filter.to_filter())?
                .iter()
                .map(|a| AccountRow::new(a, wide))
                .collect();
            output::print_output(rows, session.format)
        }

        AccountCommands::Role { new_role, filter } => {
            let ids = selected_ids(session, &filter)?;
            if ids.is_empty() {
                print_info("No accounts match the selection");
                return Ok(());
            }
            let changed = ledger.set_account_role(&ids, new_role)?;
            ledger.flush()?;
            print_success(&format!("Set {} account(s) to {}", changed, new_role));
            Ok(())
        }

        AccountCommands::Purge { filter, yes } => {
            let ids = selected_ids(session, &filter)?;
            if ids.is_empty() {
                print_info("No accounts match the selection");
                return Ok(());
            }
            if !yes && !confirm(format!("Purge the credentials of {} account(s)?", ids.len())) {
                print_error("Aborted");
                return Ok(());
            }
            let purged = ledger.purge_accounts(&ids)?;
            ledger.flush()?;
            print_success(&format!("Purged {} account(s)", purged));
            Ok(())
        }
    }
}

//! CLI command implementations

pub mod account;
pub mod history;
pub mod ledger;
pub mod network;
pub mod op;

use std::sync::Arc;

use clap::Args;
use walletops_ledger::LedgerStore;
use walletops_types::{parse_amount, AccountFilter, AccountId, AccountRole, Amount, PurgeState};

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::OutputFormat;

/// What every command runs against.
pub struct Session {
    pub config: CliConfig,
    pub ledger: Arc<LedgerStore>,
    pub format: OutputFormat,
}

impl Session {
    pub fn open(config: CliConfig, format: OutputFormat) -> CliResult<Self> {
        let path = config.ledger_path()?;
        tracing::debug!(path = %path.display(), "opening ledger");
        Ok(Self {
            config,
            ledger: Arc::new(LedgerStore::open(path)),
            format,
        })
    }
}

/// Parse a fee rate given in gwei.
pub(crate) fn parse_gwei(raw: &str) -> CliResult<Amount> {
    Ok(parse_amount(&format!("{}g", raw.trim()))?)
}

/// Account selection flags shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Select by account id
    #[arg(long)]
    pub id: Option<u64>,

    /// Select by role (unused, funding, transaction or u/f/t)
    #[arg(long)]
    pub role: Option<AccountRole>,

    /// Select by address
    #[arg(long)]
    pub address: Option<String>,

    /// Only accounts whose credential was purged
    #[arg(long, conflicts_with = "unpurged")]
    pub purged: bool,

    /// Only accounts that still hold a credential
    #[arg(long)]
    pub unpurged: bool,
}

impl FilterArgs {
    pub fn to_filter(&self) -> AccountFilter {
        let purge_state = if self.purged {
            PurgeState::Purged
        } else if self.unpurged {
            PurgeState::Unpurged
        } else {
            PurgeState::All
        };
        AccountFilter {
            id: self.id.map(AccountId::new),
            role: self.role,
            address: self.address.clone(),
            purge_state,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.role.is_none()
            && self.address.is_none()
            && !self.purged
            && !self.unpurged
    }
}

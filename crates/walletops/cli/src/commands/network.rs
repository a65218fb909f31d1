//! `wops network`: manage network targets.

use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use walletops_ledger::{NetworkUpdate, NewNetwork};
use walletops_types::{format_amount, Amount, NetworkTarget, WEI_PER_GWEI};

use super::{parse_gwei, Session};
use crate::error::CliResult;
use crate::output::{self, print_info, print_success};

/// Network subcommands
#[derive(Subcommand, Debug)]
pub enum NetworkCommands {
    /// Register a network
    Add {
        /// Alias, optionally ending in a version number (e.g. sepolia2)
        alias: String,

        /// JSON-RPC endpoint
        endpoint: String,

        /// Chain id
        #[arg(long)]
        chain_id: Option<u64>,

        /// Fixed fee rate in gwei
        #[arg(long)]
        gas: Option<String>,
    },

    /// Change a registered network
    Set {
        /// Network alias
        alias: String,

        /// New JSON-RPC endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// New chain id
        #[arg(long)]
        chain_id: Option<u64>,

        /// New fixed fee rate in gwei
        #[arg(long, conflicts_with = "clear_gas")]
        gas: Option<String>,

        /// Query the fee rate from the endpoint again
        #[arg(long)]
        clear_gas: bool,
    },

    /// List networks
    List,

    /// Remove a network
    Remove {
        /// Network alias
        alias: String,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct NetworkRow {
    id: String,
    alias: String,
    endpoint: String,
    chain: String,
    gas: String,
}

impl From<NetworkTarget> for NetworkRow {
    fn from(n: NetworkTarget) -> Self {
        Self {
            id: n.id.value().to_string(),
            alias: n.alias,
            endpoint: n.endpoint,
            chain: n.chain_id.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
            gas: n.gas_override.map(format_gwei).unwrap_or_else(|| "endpoint".into()),
        }
    }
}

fn format_gwei(wei: Amount) -> String {
    // format_amount renders 18 decimals; shift to 9.
    format!("{} gwei", format_amount(wei.saturating_mul(WEI_PER_GWEI)))
}

/// Execute a network command
pub fn execute(command: NetworkCommands, session: &Session) -> CliResult<()> {
    let ledger = &session.ledger;
    match command {
        NetworkCommands::Add {
            alias,
            endpoint,
            chain_id,
            gas,
        } => {
            let gas_override = gas.as_deref().map(parse_gwei).transpose()?;
            let network = ledger.add_network(NewNetwork {
                alias,
                endpoint,
                chain_id,
                gas_override,
            })?;
            ledger.flush()?;
            print_success(&format!("Added {} ({})", network.alias, network.id));
            Ok(())
        }

        NetworkCommands::Set {
            alias,
            endpoint,
            chain_id,
            gas,
            clear_gas,
        } => {
            let update = NetworkUpdate {
                endpoint,
                chain_id,
                gas_override: gas.as_deref().map(parse_gwei).transpose()?,
                clear_gas_override: clear_gas,
            };
            let network = ledger.update_network(&alias, update)?;
            ledger.flush()?;
            print_success(&format!("Updated {}", network.alias));
            Ok(())
        }

        NetworkCommands::List => {
            let rows: Vec<NetworkRow> = ledger
                .list_networks()?
                .into_iter()
                .map(NetworkRow::from)
                .collect();
            output::print_output(rows, session.format)
        }

        NetworkCommands::Remove { alias } => {
            if ledger.remove_network(&alias)? {
                ledger.flush()?;
                print_success(&format!("Removed {}", alias));
            } else {
                print_info(&format!("No network named {}", alias));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gas_renders_in_gwei() {
        assert_eq!(format_gwei(3 * WEI_PER_GWEI), "3 gwei");
        assert_eq!(format_gwei(1_500_000_000), "1.5 gwei");
        assert_eq!(parse_gwei("2.5").unwrap(), 2_500_000_000);
    }
}

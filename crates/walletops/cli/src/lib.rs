//! Walletops CLI - command-line interface for batch account operations
//!
//! This CLI lets an operator:
//! - Run an operation across many accounts at once, and retry its failures
//! - Inspect the call/tx history of earlier runs
//! - Manage accounts, their roles and encrypted credentials
//! - Manage network targets
//! - Rotate the ledger password or delete the ledger

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod commands;
mod config;
mod error;
mod output;
mod progress;

use commands::{account, history, ledger, network, op, Session};
use config::CliConfig;
pub use error::{CliError, CliResult};
pub use output::print_error;

/// Walletops CLI application
#[derive(Parser)]
#[command(name = "wops")]
#[command(about = "Walletops - batch operations over many accounts", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "WOPS_CONFIG")]
    config: Option<String>,

    /// Ledger file, overriding the configuration
    #[arg(short, long, env = "WOPS_LEDGER")]
    ledger: Option<std::path::PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Run an operation across accounts
    Op(op::OpArgs),

    /// Show recorded calls and outcomes
    History(history::HistoryArgs),

    /// Manage accounts
    #[command(alias = "acct")]
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Manage networks
    #[command(alias = "net")]
    Network {
        #[command(subcommand)]
        command: network::NetworkCommands,
    },

    /// Re-encrypt every credential under a new password
    Rekey,

    /// Delete the ledger
    Purge {
        /// Skip confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show ledger location and contents
    Info,

    /// Show configuration
    Config,
}

/// Run using the current process arguments.
pub async fn run() -> CliResult<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
        .try_init();

    // Load config
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.ledger {
        config.ledger_path = Some(path);
    }

    if let Commands::Config = cli.command {
        println!("Ledger: {}", config.ledger_path()?.display());
        println!("Default network: {:?}", config.default_network);
        println!("RPC timeout: {:?}", config.rpc_timeout());
        println!("Confirm poll interval: {:?}", config.poll_interval());
        return Ok(());
    }

    let session = Session::open(config, cli.output)?;

    // Execute command
    match cli.command {
        Commands::Op(args) => op::execute(args, &session).await,
        Commands::History(args) => history::execute(args, &session),
        Commands::Account { command } => account::execute(command, &session),
        Commands::Network { command } => network::execute(command, &session),
        Commands::Rekey => ledger::rekey(&session),
        Commands::Purge { yes } => ledger::purge(&session, yes),
        Commands::Info => ledger::info(&session),
        Commands::Config => Ok(()),
    }
}

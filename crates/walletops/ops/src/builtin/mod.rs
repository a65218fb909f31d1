//! Built-in operations.

mod balance;
mod drain;
mod dummy;
mod fund;

pub use balance::{BalanceArgs, BalanceOperation};
pub use drain::{DrainArgs, DrainOperation, NOTHING_TO_DRAIN};
pub use dummy::DummyOperation;
pub use fund::{FundArgs, FundOperation, ALREADY_SATISFIED};

use clap::{CommandFactory, Parser};
use walletops_types::{require_address, Amount, TypesError};

use crate::capability::Transport;
use crate::error::{OperationError, Result};

/// Gas used by a plain native transfer.
pub const NATIVE_TRANSFER_GAS: Amount = 21_000;

/// Parse a whitespace separated argument string with a clap parser.
pub(crate) fn parse_args<T: Parser>(operation: &str, raw: &str) -> Result<T> {
    T::try_parse_from(std::iter::once(operation).chain(raw.split_whitespace())).map_err(|e| {
        let rendered = e.to_string();
        let reason = rendered
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("error: ")
            .to_string();
        OperationError::InvalidArgs {
            operation: operation.to_string(),
            reason,
        }
    })
}

pub(crate) fn render_help<T: CommandFactory>() -> String {
    T::command().render_help().to_string()
}

pub(crate) fn address_arg(raw: &str) -> std::result::Result<String, TypesError> {
    require_address(raw).map(str::to_string)
}

/// Native balance, or the token balance when `token` is set.
pub(crate) async fn balance_of(
    transport: &dyn Transport,
    token: Option<&str>,
    address: &str,
) -> Result<Amount> {
    match token {
        Some(token) => transport.get_token_balance(token, address).await,
        None => transport.get_balance(address).await,
    }
}

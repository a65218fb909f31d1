use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use walletops_types::format_amount;

use super::{address_arg, balance_of, parse_args, render_help};
use crate::error::Result;
use crate::operation::{Operation, OperationArgs, OperationContext};

/// Native or token balance of each account.
#[derive(Debug, Default, Clone, Copy)]
pub struct BalanceOperation;

#[derive(Debug, Clone, Parser)]
#[command(name = "balance", about = "Balance of each target account")]
pub struct BalanceArgs {
    /// Token contract; omit (or pass 0x) for the native currency
    #[arg(value_parser = token_arg)]
    pub token: Option<String>,
}

fn token_arg(raw: &str) -> std::result::Result<String, walletops_types::TypesError> {
    if raw == "0x" {
        Ok(String::new())
    } else {
        address_arg(raw)
    }
}

impl BalanceArgs {
    fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

#[async_trait]
impl Operation for BalanceOperation {
    fn name(&self) -> &'static str {
        "balance"
    }

    fn description(&self) -> &'static str {
        "Get the balance of every target account"
    }

    fn help(&self) -> String {
        render_help::<BalanceArgs>()
    }

    fn parse(&self, raw: &str) -> Result<OperationArgs> {
        Ok(Arc::new(parse_args::<BalanceArgs>(self.name(), raw)?))
    }

    async fn run(&self, ctx: &OperationContext) -> Result<String> {
        let args: &BalanceArgs = ctx.args(self.name())?;
        let balance = balance_of(ctx.transport.as_ref(), args.token(), &ctx.account.address).await?;
        Ok(format_amount(balance))
    }
}

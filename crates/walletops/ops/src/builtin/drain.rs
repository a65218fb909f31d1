use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use walletops_types::{parse_amount, Amount};

use super::{address_arg, balance_of, parse_args, render_help, NATIVE_TRANSFER_GAS};
use crate::capability::TransferRequest;
use crate::error::{OperationError, Result};
use crate::operation::{Operation, OperationArgs, OperationContext};

pub const NOTHING_TO_DRAIN: &str = "nothing to drain";

/// Move value from each target account to one address.
#[derive(Debug, Default, Clone, Copy)]
pub struct DrainOperation;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "drain",
    about = "Drain every target account into one address",
    after_help = "Without --amount the whole balance is drained. \
                  --upto leaves that much behind and takes precedence over --amount."
)]
pub struct DrainArgs {
    /// Address receiving the drained value
    #[arg(value_parser = address_arg)]
    pub target: String,

    /// Fixed amount to move from each account
    #[arg(long, value_parser = parse_amount)]
    pub amount: Option<Amount>,

    /// Balance to leave behind in each account
    #[arg(long, value_parser = parse_amount)]
    pub upto: Option<Amount>,

    /// Token contract to drain instead of the native currency
    #[arg(long, value_parser = address_arg)]
    pub contract: Option<String>,
}

#[async_trait]
impl Operation for DrainOperation {
    fn name(&self) -> &'static str {
        "drain"
    }

    fn description(&self) -> &'static str {
        "Drain every target account into a single address"
    }

    fn help(&self) -> String {
        render_help::<DrainArgs>()
    }

    fn parse(&self, raw: &str) -> Result<OperationArgs> {
        Ok(Arc::new(parse_args::<DrainArgs>(self.name(), raw)?))
    }

    async fn run(&self, ctx: &OperationContext) -> Result<String> {
        let args: &DrainArgs = ctx.args(self.name())?;
        let token = args.contract.as_deref();
        let source = ctx.account.address.as_str();

        let value = match (args.amount, args.upto) {
            (Some(amount), None) => amount,
            (_, upto) => {
                let balance = balance_of(ctx.transport.as_ref(), token, source).await?;
                let keep = upto.unwrap_or(0);
                let spendable = balance
                    .checked_sub(keep)
                    .ok_or(OperationError::InsufficientFunds {
                        needed: keep,
                        available: balance,
                    })?;
                if token.is_none() {
                    spendable.saturating_sub(ctx.fee_rate.saturating_mul(NATIVE_TRANSFER_GAS))
                } else {
                    spendable
                }
            }
        };
        if value == 0 {
            return Ok(NOTHING_TO_DRAIN.to_string());
        }

        let request = TransferRequest {
            from: source.to_string(),
            to: args.target.clone(),
            value,
            fee_rate: ctx.fee_rate,
            token: args.contract.clone(),
        };
        let handle = ctx.transport.submit(&ctx.account, &request).await?;
        ctx.report(&format!("submitted {}", handle));
        let receipt = ctx.transport.confirm(&handle).await?;
        if !receipt.success {
            return Err(OperationError::Reverted { hash: receipt.hash });
        }
        Ok(receipt.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walletops_types::WEI_PER_ETHER;

    #[test]
    fn target_is_required_and_validated() {
        assert!(DrainOperation.parse("").is_err());
        assert!(DrainOperation.parse("0x1234").is_err());
    }

    #[test]
    fn parses_optional_flags() {
        let args = parse_args::<DrainArgs>(
            "drain",
            "0x00000000000000000000000000000000000000dd --upto 0.5",
        )
        .unwrap();
        assert_eq!(args.upto, Some(WEI_PER_ETHER / 2));
        assert!(args.amount.is_none());
    }
}

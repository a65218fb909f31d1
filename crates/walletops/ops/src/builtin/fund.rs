use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tracing::debug;
use walletops_types::{parse_amount, Amount};

use super::{address_arg, balance_of, parse_args, render_help};
use crate::capability::TransferRequest;
use crate::error::{OperationError, Result};
use crate::operation::{Operation, OperationArgs, OperationContext, ResourceClass};

pub const ALREADY_SATISFIED: &str = "already satisfied";

/// Send value from the funding account to each target account.
#[derive(Debug, Default, Clone, Copy)]
pub struct FundOperation;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "fund",
    about = "Fund every target account from the funding account",
    after_help = "Amounts: 9 = 9 ether, 9g = 9 gwei, 9e3 = 9000 wei"
)]
pub struct FundArgs {
    /// Amount to send, or the balance to reach with --upto
    #[arg(value_parser = parse_amount)]
    pub amount: Amount,

    /// Top each account up to the amount instead of sending it
    #[arg(long)]
    pub upto: bool,

    /// Token contract to fund instead of the native currency
    #[arg(long, value_parser = address_arg)]
    pub contract: Option<String>,
}

#[async_trait]
impl Operation for FundOperation {
    fn name(&self) -> &'static str {
        "fund"
    }

    fn description(&self) -> &'static str {
        "Fund every target account from the funding account"
    }

    fn help(&self) -> String {
        render_help::<FundArgs>()
    }

    fn resource_class(&self) -> ResourceClass {
        ResourceClass::SharedFunding
    }

    fn parse(&self, raw: &str) -> Result<OperationArgs> {
        Ok(Arc::new(parse_args::<FundArgs>(self.name(), raw)?))
    }

    async fn run(&self, ctx: &OperationContext) -> Result<String> {
        let args: &FundArgs = ctx.args(self.name())?;
        let token = args.contract.as_deref();
        let target = ctx.account.address.as_str();

        let value = if args.upto {
            let current = balance_of(ctx.transport.as_ref(), token, target).await?;
            if current >= args.amount {
                return Ok(ALREADY_SATISFIED.to_string());
            }
            args.amount - current
        } else {
            args.amount
        };

        let permit = ctx.acquire_funding(self.name()).await?;
        let funding = permit.handle();
        let available = balance_of(ctx.transport.as_ref(), token, &funding.address).await?;
        if available < value {
            return Err(OperationError::InsufficientFunds {
                needed: value,
                available,
            });
        }

        let request = TransferRequest {
            from: funding.address.clone(),
            to: target.to_string(),
            value,
            fee_rate: ctx.fee_rate,
            token: args.contract.clone(),
        };
        let handle = ctx.transport.submit(funding, &request).await?;
        debug!(tx = %handle, to = target, value = %value, "funding submitted");
        ctx.report(&format!("submitted {}", handle));
        let receipt = ctx.transport.confirm(&handle).await?;
        drop(permit);

        if !receipt.success {
            return Err(OperationError::Reverted { hash: receipt.hash });
        }
        Ok(receipt.hash)
    }
}

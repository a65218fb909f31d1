//! JSON-RPC transport for EVM-style endpoints.
//!
//! Transfers go through `eth_sendTransaction`, so the endpoint must manage
//! the sending account. Token transfers and balances use the standard
//! `transfer(address,uint256)` and `balanceOf(address)` selectors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use walletops_types::Amount;

use crate::capability::{Receipt, SigningHandle, TransferRequest, Transport, TxHandle};
use crate::error::{OperationError, Result};

const BALANCE_OF_SELECTOR: &str = "70a08231";
const TRANSFER_SELECTOR: &str = "a9059cbb";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC client.
pub struct JsonRpcTransport {
    client: Client,
    endpoint: String,
    poll_interval: Duration,
    confirm_timeout: Duration,
    next_id: AtomicU64,
}

impl JsonRpcTransport {
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            poll_interval: Duration::from_secs(1),
            confirm_timeout: Duration::from_secs(300),
            next_id: AtomicU64::new(1),
        })
    }

    /// Interval between receipt polls while confirming.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "rpc request");
        let response: RpcResponse = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(OperationError::Transport(format!(
                "{} failed ({}): {}",
                method, err.code, err.message
            )));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<Amount> {
        let value = self.call(method, params).await?;
        let hex = value
            .as_str()
            .ok_or_else(|| OperationError::Transport(format!("{} returned {}", method, value)))?;
        parse_quantity(hex)
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub(crate) fn parse_quantity(hex: &str) -> Result<Amount> {
    let digits = hex
        .strip_prefix("0x")
        .ok_or_else(|| OperationError::Transport(format!("not a hex quantity: {}", hex)))?;
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    if digits.len() > 32 {
        return Err(OperationError::Transport(format!(
            "quantity exceeds 128 bits: {}",
            hex
        )));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|_| OperationError::Transport(format!("not a hex quantity: {}", hex)))
}

fn to_quantity(value: Amount) -> String {
    format!("{:#x}", value)
}

/// Left-pad an address or value to one 32-byte ABI word.
fn abi_word(hex_without_prefix: &str) -> String {
    format!("{:0>64}", hex_without_prefix.to_lowercase())
}

fn strip_0x(address: &str) -> &str {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address)
}

pub(crate) fn balance_of_call(address: &str) -> String {
    format!("0x{}{}", BALANCE_OF_SELECTOR, abi_word(strip_0x(address)))
}

pub(crate) fn transfer_call(to: &str, value: Amount) -> String {
    format!(
        "0x{}{}{}",
        TRANSFER_SELECTOR,
        abi_word(strip_0x(to)),
        abi_word(&format!("{:x}", value))
    )
}

#[async_trait]
impl Transport for JsonRpcTransport {
    async fn get_block_height(&self) -> Result<u64> {
        let height = self.quantity("eth_blockNumber", json!([])).await?;
        u64::try_from(height)
            .map_err(|_| OperationError::Transport(format!("block height {} out of range", height)))
    }

    async fn get_balance(&self, address: &str) -> Result<Amount> {
        self.quantity("eth_getBalance", json!([address, "latest"])).await
    }

    async fn get_token_balance(&self, token: &str, address: &str) -> Result<Amount> {
        self.quantity(
            "eth_call",
            json!([{ "to": token, "data": balance_of_call(address) }, "latest"]),
        )
        .await
    }

    async fn get_fee_rate(&self) -> Result<Option<Amount>> {
        let value = self.call("eth_gasPrice", json!([])).await?;
        match value.as_str() {
            Some(hex) => parse_quantity(hex).map(Some),
            None => Ok(None),
        }
    }

    async fn submit(&self, sender: &SigningHandle, request: &TransferRequest) -> Result<TxHandle> {
        if !sender.has_credential() {
            return Err(OperationError::Signer(format!(
                "{} has no credential",
                sender.label()
            )));
        }
        let tx = match &request.token {
            None => json!({
                "from": request.from,
                "to": request.to,
                "value": to_quantity(request.value),
                "gasPrice": to_quantity(request.fee_rate),
            }),
            Some(token) => json!({
                "from": request.from,
                "to": token,
                "data": transfer_call(&request.to, request.value),
                "gasPrice": to_quantity(request.fee_rate),
            }),
        };
        let hash = self.call("eth_sendTransaction", json!([tx])).await?;
        hash.as_str()
            .map(|h| TxHandle(h.to_string()))
            .ok_or_else(|| OperationError::Transport(format!("eth_sendTransaction returned {}", hash)))
    }

    async fn confirm(&self, handle: &TxHandle) -> Result<Receipt> {
        let deadline = tokio::time::Instant::now() + self.confirm_timeout;
        loop {
            let receipt = self
                .call("eth_getTransactionReceipt", json!([handle.0]))
                .await?;
            if !receipt.is_null() {
                let success = receipt
                    .get("status")
                    .and_then(Value::as_str)
                    .map_or(true, |s| s == "0x1");
                let block_number = receipt
                    .get("blockNumber")
                    .and_then(Value::as_str)
                    .and_then(|h| parse_quantity(h).ok())
                    .and_then(|n| u64::try_from(n).ok());
                return Ok(Receipt {
                    hash: handle.0.clone(),
                    block_number,
                    success,
                });
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(OperationError::Transport(format!(
                    "transaction {} not mined within {:?}",
                    handle, self.confirm_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

//! In-memory transport (for testing).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use walletops_types::Amount;

use crate::capability::{Receipt, SigningHandle, TransferRequest, Transport, TxHandle};
use crate::error::{OperationError, Result};

/// One transfer from submission to confirmation.
#[derive(Debug, Clone)]
pub struct SubmissionWindow {
    pub hash: String,
    pub sender: String,
    pub recipient: String,
    pub value: Amount,
    pub started: Instant,
    pub finished: Option<Instant>,
}

impl SubmissionWindow {
    /// Whether two closed windows overlap in time.
    pub fn overlaps(&self, other: &SubmissionWindow) -> bool {
        match (self.finished, other.finished) {
            (Some(a_end), Some(b_end)) => self.started < b_end && other.started < a_end,
            _ => true,
        }
    }
}

#[derive(Default)]
struct Chain {
    /// (token, lowercase address) -> balance; token `None` is native.
    balances: HashMap<(Option<String>, String), Amount>,
    windows: Vec<SubmissionWindow>,
    next_hash: u64,
    height: u64,
}

/// Deterministic chain double.
///
/// Balances move on submit, every transfer is recorded as a
/// [`SubmissionWindow`], and submit/confirm can be slowed down to widen
/// race windows.
pub struct InMemoryTransport {
    chain: Mutex<Chain>,
    reachable: bool,
    fee_rate: Option<Amount>,
    latency: Duration,
    failing_senders: HashSet<String>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            chain: Mutex::new(Chain {
                height: 1,
                ..Chain::default()
            }),
            reachable: true,
            fee_rate: Some(1),
            latency: Duration::ZERO,
            failing_senders: HashSet::new(),
        }
    }

    /// Liveness probe fails.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn with_fee_rate(mut self, fee_rate: Option<Amount>) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    /// Delay applied to both submit and confirm.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_balance(self, address: &str, amount: Amount) -> Self {
        self.set_balance(None, address, amount);
        self
    }

    pub fn with_token_balance(self, token: &str, address: &str, amount: Amount) -> Self {
        self.set_balance(Some(token), address, amount);
        self
    }

    /// Submissions from `address` are rejected.
    pub fn failing_sender(mut self, address: &str) -> Self {
        self.failing_senders.insert(address.to_lowercase());
        self
    }

    fn set_balance(&self, token: Option<&str>, address: &str, amount: Amount) {
        if let Ok(mut chain) = self.chain.lock() {
            chain.balances.insert(key(token, address), amount);
        }
    }

    fn chain(&self) -> Result<std::sync::MutexGuard<'_, Chain>> {
        self.chain
            .lock()
            .map_err(|_| OperationError::Transport("chain lock poisoned".to_string()))
    }

    pub fn balance_of(&self, token: Option<&str>, address: &str) -> Amount {
        self.chain
            .lock()
            .ok()
            .and_then(|c| c.balances.get(&key(token, address)).copied())
            .unwrap_or(0)
    }

    /// Every transfer seen so far, in submission order.
    pub fn submissions(&self) -> Vec<SubmissionWindow> {
        self.chain.lock().map(|c| c.windows.clone()).unwrap_or_default()
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn probe(&self) -> Result<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(OperationError::Transport("connection refused".to_string()))
        }
    }
}

fn key(token: Option<&str>, address: &str) -> (Option<String>, String) {
    (token.map(str::to_lowercase), address.to_lowercase())
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn get_block_height(&self) -> Result<u64> {
        self.probe()?;
        Ok(self.chain()?.height)
    }

    async fn get_balance(&self, address: &str) -> Result<Amount> {
        self.probe()?;
        Ok(self.balance_of(None, address))
    }

    async fn get_token_balance(&self, token: &str, address: &str) -> Result<Amount> {
        self.probe()?;
        Ok(self.balance_of(Some(token), address))
    }

    async fn get_fee_rate(&self) -> Result<Option<Amount>> {
        self.probe()?;
        Ok(self.fee_rate)
    }

    async fn submit(&self, sender: &SigningHandle, request: &TransferRequest) -> Result<TxHandle> {
        self.probe()?;
        if !sender.has_credential() {
            return Err(OperationError::Signer(format!(
                "{} has no credential",
                sender.label()
            )));
        }
        let started = Instant::now();
        self.delay().await;

        let mut chain = self.chain()?;
        if self.failing_senders.contains(&request.from.to_lowercase()) {
            return Err(OperationError::Transport("nonce too low".to_string()));
        }
        let token = request.token.as_deref();
        let from = key(token, &request.from);
        let available = chain.balances.get(&from).copied().unwrap_or(0);
        if available < request.value {
            return Err(OperationError::InsufficientFunds {
                needed: request.value,
                available,
            });
        }
        chain.balances.insert(from, available - request.value);
        *chain.balances.entry(key(token, &request.to)).or_insert(0) += request.value;

        chain.next_hash += 1;
        let hash = format!("0x{:064x}", chain.next_hash);
        chain.windows.push(SubmissionWindow {
            hash: hash.clone(),
            sender: request.from.to_lowercase(),
            recipient: request.to.to_lowercase(),
            value: request.value,
            started,
            finished: None,
        });
        Ok(TxHandle(hash))
    }

    async fn confirm(&self, handle: &TxHandle) -> Result<Receipt> {
        self.delay().await;
        let mut chain = self.chain()?;
        chain.height += 1;
        let height = chain.height;
        let window = chain
            .windows
            .iter_mut()
            .find(|w| w.hash == handle.0)
            .ok_or_else(|| OperationError::Transport(format!("unknown transaction {}", handle)))?;
        window.finished = Some(Instant::now());
        Ok(Receipt {
            hash: handle.0.clone(),
            block_number: Some(height),
            success: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walletops_types::AccountId;
    use zeroize::Zeroizing;

    const A: &str = "0x00000000000000000000000000000000000000aa";
    const B: &str = "0x00000000000000000000000000000000000000bb";

    fn handle(address: &str) -> SigningHandle {
        SigningHandle::new(AccountId::new(1), address, Zeroizing::new("k".into()))
    }

    fn transfer(value: Amount) -> TransferRequest {
        TransferRequest {
            from: A.into(),
            to: B.into(),
            value,
            fee_rate: 1,
            token: None,
        }
    }

    #[tokio::test]
    async fn transfer_moves_balance_and_records_window() {
        let transport = InMemoryTransport::new().with_balance(A, 100);
        let tx = transport.submit(&handle(A), &transfer(40)).await.unwrap();
        let receipt = transport.confirm(&tx).await.unwrap();
        assert!(receipt.success);
        assert_eq!(transport.balance_of(None, A), 60);
        assert_eq!(transport.balance_of(None, B), 40);

        let windows = transport.submissions();
        assert_eq!(windows.len(), 1);
        assert!(windows[0].finished.is_some());
    }

    #[tokio::test]
    async fn overdraw_is_rejected() {
        let transport = InMemoryTransport::new().with_balance(A, 10);
        let err = transport.submit(&handle(A), &transfer(11)).await.unwrap_err();
        assert!(matches!(err, OperationError::InsufficientFunds { .. }));
    }

    #[tokio::test]
    async fn unreachable_fails_probe() {
        let transport = InMemoryTransport::new().unreachable();
        assert!(transport.get_block_height().await.is_err());
    }
}

//! Credential resolver: networks, the funding account and target handles.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};
use walletops_ledger::LedgerStore;
use walletops_ops::{JsonRpcTransport, OperationError, SigningHandle, Signer, Transport};
use walletops_types::{Account, AccountFilter, Amount, NetworkTarget};

use crate::error::{DispatchError, Result};

/// Builds a transport for a network target.
pub trait Connector: Send + Sync {
    fn connect(&self, target: &NetworkTarget) -> std::result::Result<Arc<dyn Transport>, OperationError>;
}

/// Connects over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct JsonRpcConnector {
    pub request_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for JsonRpcConnector {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

impl Connector for JsonRpcConnector {
    fn connect(&self, target: &NetworkTarget) -> std::result::Result<Arc<dyn Transport>, OperationError> {
        let transport = JsonRpcTransport::new(target.endpoint.clone(), self.request_timeout)?
            .with_poll_interval(self.poll_interval);
        Ok(Arc::new(transport))
    }
}

/// Hands out one pre-built transport for every target (for testing).
#[derive(Clone)]
pub struct StaticConnector {
    transport: Arc<dyn Transport>,
}

impl StaticConnector {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl Connector for StaticConnector {
    fn connect(&self, _target: &NetworkTarget) -> std::result::Result<Arc<dyn Transport>, OperationError> {
        Ok(self.transport.clone())
    }
}

/// A live network ready for a run.
pub struct ResolvedNetwork {
    pub target: NetworkTarget,
    pub transport: Arc<dyn Transport>,
    pub fee_rate: Amount,
    pub block_height: u64,
}

/// Turns ledger records into things a run can use.
pub struct CredentialResolver {
    ledger: Arc<LedgerStore>,
    signer: Arc<dyn Signer>,
    connector: Arc<dyn Connector>,
}

impl CredentialResolver {
    pub fn new(ledger: Arc<LedgerStore>, signer: Arc<dyn Signer>, connector: Arc<dyn Connector>) -> Self {
        Self {
            ledger,
            signer,
            connector,
        }
    }

    /// Look up a network, probe it once and settle on a fee rate.
    ///
    /// Fee rate order: `fee_override`, the network's stored override, then
    /// the endpoint's own quote.
    pub async fn resolve_network(
        &self,
        alias: &str,
        fee_override: Option<Amount>,
    ) -> Result<ResolvedNetwork> {
        let target = self
            .ledger
            .get_network(alias)?
            .ok_or_else(|| DispatchError::UnknownNetwork(alias.to_string()))?;

        let unreachable = |reason: String| DispatchError::NetworkUnreachable {
            alias: target.alias.clone(),
            endpoint: target.endpoint.clone(),
            reason,
        };
        let transport = self
            .connector
            .connect(&target)
            .map_err(|e| unreachable(e.to_string()))?;
        let block_height = match transport.get_block_height().await {
            Ok(height) => height,
            Err(e) => {
                error!(network = %target.alias, endpoint = %target.endpoint, error = %e, "liveness probe failed");
                return Err(unreachable(e.to_string()));
            }
        };
        debug!(network = %target.alias, block_height, "network reachable");

        let fee_rate = match fee_override.or(target.gas_override) {
            Some(rate) => Some(rate),
            None => match transport.get_fee_rate().await {
                Ok(rate) => rate,
                Err(e) => {
                    warn!(network = %target.alias, error = %e, "fee rate query failed");
                    None
                }
            },
        };
        let fee_rate = fee_rate.ok_or_else(|| DispatchError::NoFeeRate(target.alias.clone()))?;

        Ok(ResolvedNetwork {
            target,
            transport,
            fee_rate,
            block_height,
        })
    }

    /// The funding account, decrypted.
    pub fn resolve_funding(&self) -> Result<SigningHandle> {
        let account = self
            .ledger
            .funding_account()?
            .ok_or(DispatchError::NoFundingAccount)?;
        if account.is_purged() {
            return Err(DispatchError::FundingPurged(account.id));
        }
        self.bind(&account)
    }

    /// Handles for every account matching `filter`.
    pub fn resolve_targets(&self, filter: &AccountFilter) -> Result<Vec<SigningHandle>> {
        let accounts = self.ledger.get_accounts(filter)?;
        self.bind_all(&accounts)
    }

    /// Handles for the given accounts. Purged accounts and accounts whose
    /// credential fails to decrypt are kept, flagged, so every target gets a
    /// recorded attempt.
    pub fn bind_all(&self, accounts: &[Account]) -> Result<Vec<SigningHandle>> {
        Ok(accounts
            .iter()
            .map(|account| match self.bind(account) {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(account_id = %account.id, error = %e, "credential unreadable");
                    let reason = match e {
                        DispatchError::CredentialUnreadable { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    SigningHandle::unreadable(account.id, account.address.clone(), reason)
                }
            })
            .collect())
    }

    fn bind(&self, account: &Account) -> Result<SigningHandle> {
        match account.encrypted_key.as_deref() {
            None => Ok(SigningHandle::without_credential(account.id, account.address.clone())),
            Some(cipher) => {
                let secret = self
                    .signer
                    .decrypt(cipher)
                    .map_err(|e| DispatchError::CredentialUnreadable {
                        account: account.id,
                        reason: e.to_string(),
                    })?;
                Ok(SigningHandle::new(account.id, account.address.clone(), secret))
            }
        }
    }
}

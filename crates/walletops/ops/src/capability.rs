//! Capabilities consumed by operations.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use walletops_types::{AccountId, Amount};
use zeroize::Zeroizing;

use crate::error::Result;

/// Symmetric wrapper for credentials at rest.
///
/// Callers treat ciphertexts as opaque strings.
pub trait Signer: Send + Sync {
    /// Encrypt a plaintext credential.
    fn sign(&self, plaintext: &str) -> Result<String>;

    /// Decrypt a credential produced by [`Signer::sign`].
    fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>>;

    /// Whether `ciphertext` was produced under this signer's key.
    fn verify(&self, ciphertext: &str) -> bool;
}

enum Credential {
    Secret(Zeroizing<String>),
    Purged,
    Unreadable(String),
}

/// A decrypted account bound for one run.
///
/// The secret is zeroed on drop and never printed. Accounts whose credential
/// is purged or cannot be decrypted still get a handle, flagged, so the
/// attempt can be recorded.
pub struct SigningHandle {
    pub account_id: AccountId,
    pub address: String,
    credential: Credential,
}

impl SigningHandle {
    pub fn new(account_id: AccountId, address: impl Into<String>, secret: Zeroizing<String>) -> Self {
        Self {
            account_id,
            address: address.into(),
            credential: Credential::Secret(secret),
        }
    }

    /// Handle for an account whose credential was purged.
    pub fn without_credential(account_id: AccountId, address: impl Into<String>) -> Self {
        Self {
            account_id,
            address: address.into(),
            credential: Credential::Purged,
        }
    }

    /// Handle for an account whose stored credential failed to decrypt.
    pub fn unreadable(account_id: AccountId, address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            account_id,
            address: address.into(),
            credential: Credential::Unreadable(reason.into()),
        }
    }

    pub fn has_credential(&self) -> bool {
        matches!(self.credential, Credential::Secret(_))
    }

    pub fn secret(&self) -> Option<&str> {
        match &self.credential {
            Credential::Secret(secret) => Some(secret.as_str()),
            _ => None,
        }
    }

    /// Why a stored credential could not be decrypted.
    pub fn unreadable_reason(&self) -> Option<&str> {
        match &self.credential {
            Credential::Unreadable(reason) => Some(reason),
            _ => None,
        }
    }

    /// Progress label, e.g. `wid 3, 0x5aAe`.
    pub fn label(&self) -> String {
        let short: String = self.address.chars().take(7).collect();
        format!("{}, {}", self.account_id, short)
    }
}

impl fmt::Debug for SigningHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningHandle")
            .field("account_id", &self.account_id)
            .field("address", &self.address)
            .field("has_credential", &self.has_credential())
            .finish()
    }
}

/// A value transfer to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub value: Amount,
    pub fee_rate: Amount,
    /// Token contract; `None` moves the native currency.
    pub token: Option<String>,
}

/// Submitted transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle(pub String);

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Confirmation of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub hash: String,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Network endpoint an operation runs against.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Current block height; used as the liveness probe.
    async fn get_block_height(&self) -> Result<u64>;

    async fn get_balance(&self, address: &str) -> Result<Amount>;

    async fn get_token_balance(&self, token: &str, address: &str) -> Result<Amount>;

    /// Current fee rate in wei, `None` if the endpoint does not report one.
    async fn get_fee_rate(&self) -> Result<Option<Amount>>;

    async fn submit(&self, sender: &SigningHandle, request: &TransferRequest) -> Result<TxHandle>;

    /// Wait for a submitted transaction to be mined.
    async fn confirm(&self, handle: &TxHandle) -> Result<Receipt>;
}

/// Receives status lines from running operations. Fire-and-forget.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, label: &str, message: &str);

    /// Final line for an account.
    fn finish(&self, label: &str, _success: bool, message: &str) {
        self.report(label, message);
    }
}

/// Reporter that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, label: &str, message: &str) {
        debug!(account = label, "{}", message);
    }
}

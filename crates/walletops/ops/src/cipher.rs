//! Password-derived credential cipher.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::capability::Signer;
use crate::error::{OperationError, Result};

const NONCE_LEN: usize = 12;

/// AES-256-GCM keyed by the SHA-256 of the operator password.
///
/// Ciphertexts are `base64(nonce || ciphertext)` with a fresh random nonce
/// per call, so encrypting the same plaintext twice gives different output.
pub struct PasswordSigner {
    key: Zeroizing<[u8; 32]>,
}

impl PasswordSigner {
    pub fn new(password: &str) -> Self {
        let digest = Sha256::digest(password.as_bytes());
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&digest);
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(self.key.as_slice())
            .map_err(|_| OperationError::Signer("invalid key length".to_string()))
    }
}

impl Signer for PasswordSigner {
    fn sign(&self, plaintext: &str) -> Result<String> {
        let cipher = self.cipher()?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| OperationError::Signer("encryption failed".to_string()))?;

        let mut packed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        packed.extend_from_slice(&nonce_bytes);
        packed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(packed))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>> {
        let raw = BASE64
            .decode(ciphertext.as_bytes())
            .map_err(|e| OperationError::Signer(format!("malformed ciphertext: {}", e)))?;
        if raw.len() <= NONCE_LEN {
            return Err(OperationError::Signer("ciphertext too short".to_string()));
        }
        let (nonce_raw, body) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce_raw), body)
            .map_err(|_| OperationError::Signer("wrong password or corrupted credential".to_string()))?;
        let plaintext = Zeroizing::new(plaintext);
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| OperationError::Signer("credential is not valid UTF-8".to_string()))?;
        Ok(Zeroizing::new(text.to_string()))
    }

    fn verify(&self, ciphertext: &str) -> bool {
        self.decrypt(ciphertext).is_ok()
    }
}

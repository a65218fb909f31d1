//! Password handling.
//!
//! The ledger stores one auth cipher: a known marker encrypted under the
//! password. A password is accepted when the marker decrypts under it. The
//! first password ever entered sets the cipher.

use dialoguer::Password;
use walletops_ledger::LedgerStore;
use walletops_ops::{PasswordSigner, Signer};
use zeroize::Zeroizing;

use crate::error::{CliError, CliResult};

/// Environment variable holding the ledger password.
pub const PASSWORD_ENV: &str = "WOPS_PASSWORD";

/// Environment variable holding the replacement password for `rekey`.
pub const NEW_PASSWORD_ENV: &str = "WOPS_NEW_PASSWORD";

const AUTH_MARKER: &str = "walletops";

fn read_password(env: &str, prompt: &str, confirm: bool) -> CliResult<Zeroizing<String>> {
    if let Ok(value) = std::env::var(env) {
        return Ok(Zeroizing::new(value));
    }
    let mut input = Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("Repeat password", "Passwords do not match");
    }
    Ok(Zeroizing::new(input.interact()?))
}

/// Check `password` against the ledger, setting it on first use.
pub fn unlock_with(ledger: &LedgerStore, password: &str) -> CliResult<PasswordSigner> {
    if password.is_empty() {
        return Err(CliError::Auth("empty password".into()));
    }
    let signer = PasswordSigner::new(password);
    let cipher = ledger.auth_cipher()?;
    if cipher.is_empty() {
        ledger.set_auth_cipher(signer.sign(AUTH_MARKER)?)?;
        tracing::info!("ledger password set");
        return Ok(signer);
    }
    if signer.verify(&cipher) {
        Ok(signer)
    } else {
        Err(CliError::Auth("wrong password".into()))
    }
}

/// Read the password from the environment or a prompt and unlock the ledger.
pub fn unlock(ledger: &LedgerStore) -> CliResult<PasswordSigner> {
    let first_use = ledger.auth_cipher()?.is_empty();
    let prompt = if first_use { "New ledger password" } else { "Ledger password" };
    let password = read_password(PASSWORD_ENV, prompt, first_use)?;
    unlock_with(ledger, &password)
}

/// Re-encrypt every credential from `old` to a signer for `new_password`.
/// Returns the number of rekeyed accounts.
pub fn rekey_with(ledger: &LedgerStore, old: &PasswordSigner, new_password: &str) -> CliResult<usize> {
    if new_password.is_empty() {
        return Err(CliError::Auth("empty password".into()));
    }
    let new = PasswordSigner::new(new_password);
    let auth_cipher = new.sign(AUTH_MARKER)?;
    let count = ledger.rekey_credentials(auth_cipher, |_, cipher| {
        let plain = old.decrypt(cipher)?;
        new.sign(&plain)
    })?;
    Ok(count)
}

/// Prompt for the replacement password.
pub fn read_new_password() -> CliResult<Zeroizing<String>> {
    read_password(NEW_PASSWORD_ENV, "New ledger password", true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use walletops_ledger::NewAccount;
    use walletops_types::{AccountFilter, AccountRole};

    #[test]
    fn first_password_is_kept() {
        let ledger = LedgerStore::in_memory();
        unlock_with(&ledger, "hunter2").unwrap();
        assert!(!ledger.auth_cipher().unwrap().is_empty());
        assert!(unlock_with(&ledger, "hunter2").is_ok());
        assert!(matches!(
            unlock_with(&ledger, "hunter3"),
            Err(CliError::Auth(_))
        ));
    }

    #[test]
    fn rekey_moves_credentials_to_the_new_password() {
        let ledger = LedgerStore::in_memory();
        let old = unlock_with(&ledger, "old").unwrap();
        ledger
            .add_accounts(vec![NewAccount {
                address: "0x00000000000000000000000000000000000000a1".into(),
                role: AccountRole::Transaction,
                encrypted_key: old.sign("secret-a").unwrap(),
            }])
            .unwrap();

        assert_eq!(rekey_with(&ledger, &old, "new").unwrap(), 1);
        assert!(unlock_with(&ledger, "old").is_err());
        let new = unlock_with(&ledger, "new").unwrap();
        let account = &ledger.get_accounts(&AccountFilter::all()).unwrap()[0];
        let key = account.encrypted_key.as_deref().unwrap();
        assert_eq!(new.decrypt(key).unwrap().as_str(), "secret-a");
    }
}

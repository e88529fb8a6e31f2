//! OS keyring as an unlock gate.
//!
//! The keyring may hold a vault's master passphrase so that an OS-level
//! authentication (login session, Touch ID on the Keychain, ...) can
//! release it.  The released passphrase still goes through `unlock` and
//! the full key derivation; the keyring never stands in for the key.
//!
//! Backends:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! Every failure is returned; the CLI falls back to a passphrase prompt.

use crate::errors::{Result, VaultError};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "passvault";

/// Keyring account name for a vault; callers pass a canonical path so
/// different relative paths to one vault share an entry.
fn entry_key(vault_id: &str) -> String {
    format!("vault:{vault_id}")
}

fn entry(vault_id: &str) -> Result<keyring::Entry> {
    keyring::Entry::new(SERVICE_NAME, &entry_key(vault_id))
        .map_err(|e| VaultError::KeyringError(format!("failed to create keyring entry: {e}")))
}

/// Store the passphrase for a vault.
pub fn store_passphrase(vault_id: &str, passphrase: &str) -> Result<()> {
    entry(vault_id)?.set_password(passphrase).map_err(|e| {
        VaultError::KeyringError(format!("failed to store passphrase in keyring: {e}"))
    })?;
    tracing::debug!("stored passphrase in keyring");
    Ok(())
}

/// Fetch the stored passphrase; `None` if nothing is stored.
pub fn get_passphrase(vault_id: &str) -> Result<Option<String>> {
    match entry(vault_id)?.get_password() {
        Ok(passphrase) => Ok(Some(passphrase)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(VaultError::KeyringError(format!(
            "failed to read from keyring: {e}"
        ))),
    }
}

/// Remove the stored passphrase; a missing entry is not an error.
pub fn delete_passphrase(vault_id: &str) -> Result<()> {
    match entry(vault_id)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(VaultError::KeyringError(format!(
            "failed to delete from keyring: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_key_is_namespaced() {
        assert_eq!(entry_key("/tmp/p.vault"), "vault:/tmp/p.vault");
    }
}

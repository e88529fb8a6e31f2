//! `passvault auth` — manage authentication methods (keyring, keyfile).
//!
//! Subcommands:
//! - `passvault auth keyring`          — save passphrase to OS keyring
//! - `passvault auth keyring --delete` — remove passphrase from keyring
//! - `passvault auth keyfile-generate` — generate a new random keyfile
//!
//! When the keyring feature is not compiled in, keyring commands return
//! a helpful error message.

use std::path::PathBuf;

use crate::cli::output;
use crate::cli::Cli;
use crate::errors::Result;
#[cfg(not(feature = "keyring-store"))]
use crate::errors::VaultError;

/// Execute `passvault auth keyring` — save or delete the passphrase.
pub fn execute_keyring(cli: &Cli, delete: bool) -> Result<()> {
    #[cfg(feature = "keyring-store")]
    {
        let mut manager = crate::cli::manager(cli)?;
        let vault_id = manager.path().to_string_lossy().into_owned();

        if delete {
            crate::keyring::delete_passphrase(&vault_id)?;
            output::success("Passphrase removed from OS keyring.");
        } else {
            // Verify the passphrase works before storing it; skip the
            // keyring lookup since the user is setting it explicitly.
            let password = crate::cli::prompt_password_for_vault(None)?;
            manager.unlock(&password)?;
            manager.lock();

            crate::keyring::store_passphrase(&vault_id, &password)?;
            output::success("Passphrase saved to OS keyring. Future unlocks will use it.");
        }

        Ok(())
    }

    #[cfg(not(feature = "keyring-store"))]
    {
        let _ = (cli, delete);
        Err(VaultError::KeyringError(
            "keyring support not compiled — rebuild with `cargo build --features keyring-store`"
                .into(),
        ))
    }
}

/// Execute `passvault auth keyfile-generate` — create a new random keyfile.
pub fn execute_keyfile_generate(cli: &Cli, keyfile_path: Option<&str>) -> Result<()> {
    let path = match keyfile_path {
        Some(p) => PathBuf::from(p),
        None => {
            let settings = crate::cli::settings()?;
            let vault = crate::cli::vault_path(cli, &settings)?;
            let mut name = vault.file_name().unwrap_or_default().to_os_string();
            name.push(".keyfile");
            vault.with_file_name(name)
        }
    };

    crate::crypto::generate_keyfile(&path)?;

    output::success(&format!("Keyfile generated at {}", path.display()));
    output::warning("Keep this file secret! Losing it locks you out of the vault.");
    output::tip("Pass --keyfile <path> to `passvault init` to require it.");

    Ok(())
}

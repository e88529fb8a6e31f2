//! `passvault rotate-key` — change the vault master passphrase.
//!
//! Unlocks with the current passphrase, then re-salts, re-derives the
//! key from the new passphrase and re-seals the vault atomically.

use crate::cli::output;
use crate::cli::{audit, open_manager, prompt_new_password, Cli, NEW_PASSWORD_ENV};
use crate::errors::Result;

/// Execute the `rotate-key` command.
pub fn execute(cli: &Cli) -> Result<()> {
    output::info("Enter your current vault passphrase.");
    let mut manager = open_manager(cli)?;

    output::info("Choose your new vault passphrase.");
    let new_password = prompt_new_password(NEW_PASSWORD_ENV)?;
    manager.change_passphrase(&new_password)?;

    let count = manager.vault()?.account_count();
    audit(
        manager.path(),
        "rotate-key",
        Some(&format!("{count} accounts re-encrypted")),
    );

    output::success(&format!(
        "Passphrase changed for {} ({count} accounts re-encrypted)",
        manager.path().display()
    ));

    #[cfg(feature = "keyring-store")]
    output::tip("If you saved the old passphrase with `passvault auth keyring`, run it again.");

    Ok(())
}

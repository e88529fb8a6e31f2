//! `passvault init` — create a new vault, optionally migrating a legacy
//! `passwords.json` into it.

use crate::cli::output;
use crate::cli::{audit, confirm, manager, prompt_new_password, settings, Cli, PASSWORD_ENV};
use crate::errors::{Result, VaultError};

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = settings()?;
    let mut manager = manager(cli)?;
    let vault_path = manager.path().to_path_buf();

    if vault_path.exists() {
        output::tip("Use `passvault add` to add credentials to the existing vault.");
        return Err(VaultError::VaultAlreadyExists(vault_path));
    }

    let cwd = std::env::current_dir()?;
    let legacy_path = settings.legacy_path(&cwd);
    let migrate = legacy_path.exists()
        && confirm(
            &format!(
                "Found {}. Migrate its credentials into the new vault?",
                settings.legacy_file
            ),
            false,
        )?;

    let password = prompt_new_password(PASSWORD_ENV)?;

    if migrate {
        let bytes = zeroize::Zeroizing::new(std::fs::read(&legacy_path)?);
        let report = manager.create_from_legacy(&password, &bytes)?;
        output::success(&format!(
            "Vault created at {} with {} accounts from {}",
            vault_path.display(),
            report.accounts_added,
            settings.legacy_file
        ));
        output::warning(&format!(
            "{} still holds cleartext passwords. Delete it once you have checked the vault.",
            legacy_path.display()
        ));
        audit(&vault_path, "init", Some("vault created from legacy data"));
    } else {
        manager.create(&password)?;
        output::success(&format!("Vault created at {}", vault_path.display()));
        if legacy_path.exists() {
            output::tip("Run `passvault import <FILE>` to bring in existing credentials.");
        }
        audit(&vault_path, "init", Some("vault created"));
    }

    if cli.keyfile.is_some() {
        output::info("Vault created with keyfile — you must pass --keyfile on every command.");
    }
    output::tip("Run `passvault add <LABEL> <USERNAME>` to add a credential.");
    output::tip("Run `passvault list` to see all entries.");

    Ok(())
}

//! `passvault migrate` — turn a cleartext legacy data file into a new
//! encrypted vault.

use std::fs;
use std::path::PathBuf;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{audit, manager, prompt_new_password, settings, Cli, PASSWORD_ENV};
use crate::errors::{Result, VaultError};

/// Execute the `migrate` command.
pub fn execute(cli: &Cli, file: Option<&str>) -> Result<()> {
    let settings = settings()?;
    let cwd = std::env::current_dir()?;
    let source = file.map_or_else(|| settings.legacy_path(&cwd), PathBuf::from);

    if !source.exists() {
        return Err(VaultError::CommandFailed(format!(
            "legacy file not found: {}",
            source.display()
        )));
    }

    let mut manager = manager(cli)?;
    if manager.path().exists() {
        output::tip("Use `passvault import <FILE>` to merge into an existing vault.");
        return Err(VaultError::VaultAlreadyExists(manager.path().to_path_buf()));
    }

    let bytes = Zeroizing::new(fs::read(&source)?);
    let password = prompt_new_password(PASSWORD_ENV)?;
    let report = manager.create_from_legacy(&password, &bytes)?;

    audit(
        manager.path(),
        "migrate",
        Some(&format!(
            "{} entries, {} accounts",
            report.entries_added, report.accounts_added
        )),
    );

    output::success(&format!(
        "Migrated {} accounts in {} entries into {}",
        report.accounts_added,
        report.entries_added,
        manager.path().display()
    ));
    output::warning(&format!(
        "{} still holds cleartext passwords. Delete it once you have checked the vault.",
        source.display()
    ));

    Ok(())
}

//! `passvault get` — print a single credential's password.

use crate::cli::{audit, open_manager, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `get` command.
///
/// Without a username the entry's primary (first) account is used.
pub fn execute(cli: &Cli, label: &str, username: Option<&str>) -> Result<()> {
    let manager = open_manager(cli)?;
    let vault = manager.vault()?;

    let credential = match username {
        Some(name) => vault.credential(label, name)?,
        None => vault
            .entry(label)
            .and_then(|e| e.primary())
            .ok_or_else(|| VaultError::NotFound(format!("Entry '{}'", label.trim())))?,
    };

    println!("{}", credential.secret);
    audit(manager.path(), "get", None);

    Ok(())
}

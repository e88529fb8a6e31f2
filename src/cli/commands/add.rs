//! `passvault add` — add a credential to a website entry.

use crate::cli::output;
use crate::cli::{audit, open_manager, read_secret, Cli};
use crate::errors::Result;

/// Execute the `add` command.
pub fn execute(
    cli: &Cli,
    label: &str,
    username: &str,
    secret: Option<&str>,
    description: &str,
) -> Result<()> {
    let secret = read_secret(&format!("Password for {username} @ {label}"), secret)?;

    let mut manager = open_manager(cli)?;
    manager.add_credential(label, username, &secret, description)?;
    manager.save()?;

    audit(manager.path(), "add", None);

    let vault = manager.vault()?;
    output::success(&format!(
        "Added '{}' to '{}' ({} accounts in {} entries)",
        username.trim(),
        label.trim(),
        vault.account_count(),
        vault.len()
    ));

    Ok(())
}

//! `passvault rm` — remove a credential or a whole entry.

use crate::cli::output;
use crate::cli::{audit, confirm, open_manager, Cli};
use crate::errors::Result;

/// Execute the `rm` command.
pub fn execute(cli: &Cli, label: &str, username: Option<&str>, force: bool) -> Result<()> {
    let mut manager = open_manager(cli)?;

    let what = match username {
        Some(name) => format!("account '{name}' from '{}'", label.trim()),
        None => format!("entry '{}' and all its accounts", label.trim()),
    };

    if !force && !confirm(&format!("Remove {what}?"), false)? {
        output::info("Cancelled.");
        return Ok(());
    }

    match username {
        Some(name) => manager.remove_credential(label, name)?,
        None => manager.remove_entry(label)?,
    }
    manager.save()?;

    audit(manager.path(), "rm", None);
    output::success(&format!("Removed {what}"));

    Ok(())
}

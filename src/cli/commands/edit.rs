//! `passvault edit` — change fields of an existing credential.

use crate::cli::output;
use crate::cli::{audit, open_manager, read_secret, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::CredentialUpdate;

/// Execute the `edit` command.
pub fn execute(
    cli: &Cli,
    label: &str,
    username: &str,
    rename: Option<&str>,
    new_password: bool,
    description: Option<&str>,
) -> Result<()> {
    let mut update = CredentialUpdate {
        username: rename.map(str::to_string),
        secret: None,
        description: description.map(str::to_string),
    };
    if update.is_empty() && !new_password {
        return Err(VaultError::CommandFailed(
            "nothing to change — pass --rename, --password, or --description".into(),
        ));
    }

    let mut manager = open_manager(cli)?;
    if new_password {
        let mut secret = read_secret(&format!("New password for {username} @ {label}"), None)?;
        update.secret = Some(std::mem::take(&mut *secret));
    }

    manager.edit_credential(label, username, update)?;
    manager.save()?;

    audit(manager.path(), "edit", None);
    output::success(&format!("Updated '{}' in '{}'", username, label.trim()));

    Ok(())
}

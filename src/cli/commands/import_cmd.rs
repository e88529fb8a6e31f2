//! `passvault import` — merge credentials from an export or legacy file.
//!
//! The whole file is validated before anything is merged; a bad record
//! leaves the vault untouched.

use std::fs;
use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{audit, open_manager, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::MergePolicy;

/// Execute the `import` command.
pub fn execute(cli: &Cli, file_path: &str, replace: bool) -> Result<()> {
    let source = Path::new(file_path);
    if !source.exists() {
        return Err(VaultError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }
    let bytes = Zeroizing::new(fs::read(source)?);

    let mut manager = open_manager(cli)?;
    let policy = if replace {
        MergePolicy::Replace
    } else {
        MergePolicy::Merge
    };
    let report = manager.import(&bytes, policy)?;
    manager.save()?;

    let summary = output::merge_summary(&report);
    audit(manager.path(), "import", Some(&summary));

    if replace {
        output::success(&format!(
            "Replaced vault contents with {} ({summary})",
            source.display()
        ));
    } else {
        output::success(&format!("Imported {} ({summary})", source.display()));
    }

    Ok(())
}

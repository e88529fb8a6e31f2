//! `passvault export` — write the vault out as cleartext.
//!
//! Supported formats:
//! - `json` (default): export document, re-importable with `passvault import`
//! - `text`: human-readable report

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::cli::output;
use crate::cli::{audit, open_manager, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::ExportFormat;

/// Execute the `export` command.
pub fn execute(cli: &Cli, format: Option<&str>, output_path: Option<&str>) -> Result<()> {
    let format = match format {
        Some(name) => parse_format(name)?,
        None => output_path.map_or(ExportFormat::Json, |p| ExportFormat::from_path(Path::new(p))),
    };

    if let Some(dest) = output_path {
        // Safety: refuse to overwrite vault files.
        if Path::new(dest)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("vault"))
        {
            return Err(VaultError::CommandFailed(
                "refusing to export over a .vault file".into(),
            ));
        }
    }

    let manager = open_manager(cli)?;
    let content = manager.export(format)?;
    let count = manager.vault()?.account_count();

    audit(
        manager.path(),
        "export",
        Some(&format!("{count} accounts, format: {format:?}")),
    );

    match output_path {
        Some(dest) => {
            write_private(Path::new(dest), &content)?;
            output::success(&format!("Exported {count} accounts to {dest}"));
            output::warning("The export contains cleartext passwords. Store it somewhere safe.");
        }
        None => {
            std::io::stdout().write_all(&content)?;
        }
    }

    Ok(())
}

fn parse_format(name: &str) -> Result<ExportFormat> {
    match name.to_lowercase().as_str() {
        "json" => Ok(ExportFormat::Json),
        "text" | "txt" => Ok(ExportFormat::Text),
        other => Err(VaultError::CommandFailed(format!(
            "unknown export format '{other}' — use 'json' or 'text'"
        ))),
    }
}

/// Write a file that only the owner can read on Unix.
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|e| VaultError::CommandFailed(format!("failed to write export file: {e}")))?;
    file.write_all(content)?;
    Ok(())
}

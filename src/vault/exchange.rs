//! Cleartext interchange: JSON export/import and a readable text report.
//!
//! Exported files contain every secret in plaintext. The buffers returned
//! here are `Zeroizing` so the in-memory copy is wiped once the caller has
//! written it out.

use std::fmt::Write as _;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

use super::records::{self, CurrentRecord};
use super::store::Vault;

/// Version string written into `export_info.app_version`.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for `export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Text,
}

impl ExportFormat {
    /// Pick a format from a file extension (`.txt` means text, anything else JSON).
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("txt") => Self::Text,
            _ => Self::Json,
        }
    }
}

/// Summary block at the top of an export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportInfo {
    pub export_time: String,
    pub total_websites: usize,
    pub total_accounts: usize,
    pub app_version: String,
}

#[derive(Serialize)]
struct ExportDocument<'a> {
    export_info: ExportInfo,
    passwords: &'a [CurrentRecord],
}

fn export_info(vault: &Vault) -> ExportInfo {
    ExportInfo {
        export_time: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        total_websites: vault.len(),
        total_accounts: vault.account_count(),
        app_version: APP_VERSION.to_string(),
    }
}

/// Render the whole vault in the requested format.
pub fn export(vault: &Vault, format: ExportFormat) -> Result<Zeroizing<Vec<u8>>> {
    match format {
        ExportFormat::Json => export_json(vault),
        ExportFormat::Text => Ok(export_text(vault)),
    }
}

fn export_json(vault: &Vault) -> Result<Zeroizing<Vec<u8>>> {
    let passwords = records::to_records(vault);
    let doc = ExportDocument {
        export_info: export_info(vault),
        passwords: &passwords,
    };
    serde_json::to_vec_pretty(&doc)
        .map(Zeroizing::new)
        .map_err(|e| VaultError::SerializationError(format!("export: {e}")))
}

fn export_text(vault: &Vault) -> Zeroizing<Vec<u8>> {
    let info = export_info(vault);
    let rule = "=".repeat(50);
    let mut out = Zeroizing::new(String::new());

    // Writing into a String cannot fail.
    let _ = writeln!(out, "PassVault export");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Exported at: {}", info.export_time);
    let _ = writeln!(out, "Websites:    {}", info.total_websites);
    let _ = writeln!(out, "Accounts:    {}", info.total_accounts);
    let _ = writeln!(out, "{rule}\n");

    for entry in vault.entries() {
        let _ = writeln!(out, "Website: {}", entry.label);
        let _ = writeln!(out, "  Accounts: {}", entry.credentials.len());
        let _ = writeln!(out, "{}", "-".repeat(40));
        for (i, cred) in entry.credentials.iter().enumerate() {
            let description = if cred.description.is_empty() {
                "(none)"
            } else {
                cred.description.as_str()
            };
            let _ = writeln!(out, "  Account {}:", i + 1);
            let _ = writeln!(out, "    Username:    {}", cred.username);
            let _ = writeln!(out, "    Password:    {}", cred.secret);
            let _ = writeln!(out, "    Description: {description}");
            let _ = writeln!(
                out,
                "    Created:     {}",
                cred.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            let _ = writeln!(out);
        }
        let _ = writeln!(out);
    }

    Zeroizing::new(out.as_bytes().to_vec())
}

/// Parse an interchange document into a standalone vault.
///
/// Accepts an export document (`{ "export_info", "passwords" }`), a bare
/// list of records, or a single record object; records may be in either
/// the legacy or the current shape. Any invalid record rejects the whole
/// document.
pub fn parse_import(bytes: &[u8]) -> Result<Vault> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| VaultError::Validation(format!("not valid JSON: {e}")))?;

    let list = match value {
        Value::Array(list) => list,
        Value::Object(mut map) => match map.remove("passwords") {
            Some(Value::Array(list)) => list,
            Some(_) => {
                return Err(VaultError::Validation("'passwords' must be a list".into()));
            }
            None => vec![Value::Object(map)],
        },
        _ => {
            return Err(VaultError::Validation(
                "expected a list of records or an export document".into(),
            ));
        }
    };

    let parsed = records::parse_records(list)?;
    let (current, migrated) = records::migrate(parsed);
    let vault = records::build_vault(current)?;
    tracing::debug!(
        entries = vault.len(),
        accounts = vault.account_count(),
        migrated,
        "parsed import document"
    );
    Ok(vault)
}

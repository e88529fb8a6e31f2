//! `passvault audit` — show what has been done to a vault.
//!
//! Entries live in `audit.db` next to the vault. By default only the
//! current vault's entries are listed; `--all` includes every vault in
//! the same directory.

use chrono::{DateTime, NaiveDate, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::{
    count_by_operation, vault_dir, vault_name, AuditEntry, AuditLog, AuditQuery, OPERATIONS,
};
use crate::cli::output;
use crate::cli::{settings, vault_path, Cli};
use crate::errors::{Result, VaultError};

/// Options for the `audit` command.
pub struct AuditArgs<'a> {
    pub last: usize,
    pub since: Option<&'a str>,
    pub operation: Option<&'a str>,
    pub all_vaults: bool,
}

/// Execute the `audit` command.
pub fn execute(cli: &Cli, args: &AuditArgs<'_>) -> Result<()> {
    let settings = settings()?;
    let path = vault_path(cli, &settings)?;

    let operation = args.operation.map(check_operation).transpose()?;
    let since = args.since.map(parse_since).transpose()?;
    let name = vault_name(&path);

    let audit = AuditLog::open(vault_dir(&path))
        .ok_or_else(|| VaultError::AuditError("failed to open audit database".into()))?;
    let entries = audit.query(&AuditQuery {
        limit: args.last,
        since,
        operation,
        vault: (!args.all_vaults).then_some(name.as_str()),
    })?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    println!("{}", render_table(&entries, args.all_vaults));
    output::info(&summary_line(&entries));

    Ok(())
}

/// Accept only operation names the CLI actually records.
fn check_operation(op: &str) -> Result<&str> {
    OPERATIONS.iter().copied().find(|known| *known == op).ok_or_else(|| {
        VaultError::CommandFailed(format!(
            "unknown operation '{op}' (expected one of: {})",
            OPERATIONS.join(", ")
        ))
    })
}

/// `--since` takes a relative age (`30m`, `24h`, `7d`, `2w`) or a date
/// (`2026-10-01`, read as midnight UTC).
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| VaultError::CommandFailed(format!("invalid date '{input}'")));
    }

    let invalid = || {
        VaultError::CommandFailed(format!(
            "invalid --since '{input}': use an age like 30m, 24h, 7d, 2w or a date like 2026-10-01"
        ))
    };
    let (split, _) = input.char_indices().last().ok_or_else(invalid)?;
    let (amount, unit) = input.split_at(split);
    let amount: i64 = amount.parse().map_err(|_| invalid())?;
    let age = match unit {
        "m" => chrono::Duration::try_minutes(amount),
        "h" => chrono::Duration::try_hours(amount),
        "d" => chrono::Duration::try_days(amount),
        "w" => chrono::Duration::try_weeks(amount),
        _ => None,
    }
    .ok_or_else(invalid)?;

    Utc::now().checked_sub_signed(age).ok_or_else(invalid)
}

fn render_table(entries: &[AuditEntry], show_vault: bool) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec!["Time", "Operation"];
    if show_vault {
        header.push("Vault");
    }
    header.push("Details");
    table.set_header(header);

    for entry in entries {
        let mut row = vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            colorize_operation(&entry.operation),
        ];
        if show_vault {
            row.push(entry.vault.clone());
        }
        row.push(entry.details.clone().unwrap_or_else(|| "-".into()));
        table.add_row(row);
    }
    table
}

/// e.g. "5 entries: 3 add, 1 import, 1 get"
fn summary_line(entries: &[AuditEntry]) -> String {
    let parts: Vec<String> = count_by_operation(entries)
        .into_iter()
        .map(|(op, n)| format!("{n} {op}"))
        .collect();
    format!("{} entries: {}", entries.len(), parts.join(", "))
}

/// Reads stand out from writes; destructive operations are red.
fn colorize_operation(op: &str) -> String {
    match op {
        "rm" => style(op).red().to_string(),
        "export" | "get" => style(op).yellow().to_string(),
        "rotate-key" => style(op).magenta().to_string(),
        "init" | "migrate" | "import" => style(op).green().to_string(),
        _ => op.to_string(),
    }
}

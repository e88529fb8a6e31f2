//! Audit log — SQLite-based operation history.
//!
//! Stores a record of every vault operation (init, add, remove, import,
//! rotate, ...) in a local SQLite database at `<vault dir>/audit.db`.
//! Only the operation name, the vault file name and a count/detail string
//! are stored; labels, usernames and secrets never reach the log.
//!
//! Designed for graceful degradation: if the database can't be opened or
//! written to, operations silently continue without logging.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rusqlite::types::ToSql;
use rusqlite::Connection;

use crate::errors::{Result, VaultError};

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub vault: String,
    pub details: Option<String>,
}

/// Operation names recorded by the CLI.
pub const OPERATIONS: &[&str] = &[
    "init",
    "migrate",
    "add",
    "edit",
    "get",
    "rm",
    "export",
    "import",
    "rotate-key",
];

/// Filter for `AuditLog::query`. `None` fields match everything.
#[derive(Debug, Clone, Copy)]
pub struct AuditQuery<'a> {
    pub limit: usize,
    pub since: Option<DateTime<Utc>>,
    pub operation: Option<&'a str>,
    /// Vault file name, as recorded by `log_audit`.
    pub vault: Option<&'a str>,
}

impl AuditQuery<'_> {
    /// The `limit` most recent entries of any kind.
    pub fn recent(limit: usize) -> Self {
        Self {
            limit,
            since: None,
            operation: None,
            vault: None,
        }
    }
}

/// Count entries per operation, in order of first appearance.
pub fn count_by_operation(entries: &[AuditEntry]) -> IndexMap<&str, usize> {
    let mut counts = IndexMap::new();
    for entry in entries {
        *counts.entry(entry.operation.as_str()).or_insert(0) += 1;
    }
    counts
}

/// SQLite-backed audit log.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `<dir>/audit.db`.
    ///
    /// Returns `None` if the database can't be opened — callers should
    /// treat this as "audit logging unavailable" and continue normally.
    pub fn open(dir: &Path) -> Option<Self> {
        let db_path = Self::db_path(dir);
        let conn = Connection::open(&db_path).ok()?;

        // Owner-only, like the vault itself.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&db_path, perms);
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                operation   TEXT NOT NULL,
                vault       TEXT NOT NULL,
                details     TEXT
            );",
        )
        .ok()?;

        Some(Self { conn })
    }

    /// Record an operation. Fire-and-forget — errors are silently ignored.
    pub fn log(&self, operation: &str, vault: &str, details: Option<&str>) {
        let now = Utc::now().to_rfc3339();
        if let Err(e) = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, vault, details)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![now, operation, vault, details],
        ) {
            tracing::debug!(error = %e, "audit write skipped");
        }
    }

    /// Query entries, most recent first.
    pub fn query(&self, filter: &AuditQuery<'_>) -> Result<Vec<AuditEntry>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ts) = filter.since {
            params.push(Box::new(ts.to_rfc3339()));
            clauses.push(format!("timestamp >= ?{}", params.len()));
        }
        if let Some(op) = filter.operation {
            params.push(Box::new(op.to_string()));
            clauses.push(format!("operation = ?{}", params.len()));
        }
        if let Some(vault) = filter.vault {
            params.push(Box::new(vault.to_string()));
            clauses.push(format!("vault = ?{}", params.len()));
        }
        params.push(Box::new(i64::try_from(filter.limit).unwrap_or(i64::MAX)));

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT id, timestamp, operation, vault, details
             FROM audit_log {where_sql}
             ORDER BY id DESC
             LIMIT ?{}",
            params.len()
        );

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| VaultError::AuditError(format!("query prepare: {e}")))?;
        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| &**p).collect();

        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                let ts_str: String = row.get(1)?;
                let timestamp = DateTime::parse_from_rfc3339(&ts_str)
                    .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp,
                    operation: row.get(2)?,
                    vault: row.get(3)?,
                    details: row.get(4)?,
                })
            })
            .map_err(|e| VaultError::AuditError(format!("query exec: {e}")))?;

        rows.map(|row| row.map_err(|e| VaultError::AuditError(format!("row parse: {e}"))))
            .collect()
    }

    /// Path of the audit database inside `dir`.
    pub fn db_path(dir: &Path) -> PathBuf {
        dir.join("audit.db")
    }
}

/// Directory holding the vault file (and therefore the audit database).
pub fn vault_dir(vault_path: &Path) -> &Path {
    match vault_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// The name a vault is recorded under: its file name.
pub fn vault_name(vault_path: &Path) -> String {
    vault_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Log an event next to `vault_path`, ignoring every failure.
pub fn log_audit(vault_path: &Path, op: &str, details: Option<&str>) {
    let name = vault_name(vault_path);

    if let Some(audit) = AuditLog::open(vault_dir(vault_path)) {
        audit.log(op, &name, details);
    }
}

//! Plaintext record shapes used at the JSON boundary.
//!
//! Two shapes exist in the wild:
//!
//! - **Legacy**: one credential per record,
//!   `{ "website", "username", "password", "created_time"? }`.
//! - **Current**: one record per site with an accounts list,
//!   `{ "website", "accounts": [ { "username", "password", ... } ] }`.
//!
//! Both are parsed into the tagged `Record` enum, normalized once by
//! `migrate`, then validated into a `Vault` by `build_vault`.  Migration
//! of current records is a no-op, so running it twice changes nothing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{VaultError, Result};

use super::model::{Credential, WebsiteEntry};
use super::store::Vault;

/// One account inside a current-shape record.
#[derive(Debug, Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct AccountRecord {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

/// A site record with an accounts list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentRecord {
    pub website: String,
    pub accounts: Vec<AccountRecord>,
}

/// A flat single-credential record.
#[derive(Debug, Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct LegacyRecord {
    pub website: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_time: Option<String>,
}

/// Either record shape, as found at the deserialization boundary.
#[derive(Debug, Clone)]
pub enum Record {
    Legacy(LegacyRecord),
    Current(CurrentRecord),
}

impl Record {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    /// Normalize to the current shape.
    pub fn into_current(self) -> CurrentRecord {
        match self {
            Self::Current(record) => record,
            Self::Legacy(mut legacy) => CurrentRecord {
                website: std::mem::take(&mut legacy.website),
                accounts: vec![AccountRecord {
                    username: std::mem::take(&mut legacy.username),
                    password: std::mem::take(&mut legacy.password),
                    description: std::mem::take(&mut legacy.description),
                    created_time: legacy.created_time.take(),
                    modified_time: None,
                }],
            },
        }
    }
}

/// Classify and parse a list of JSON records.
///
/// Errors name the 1-based position of the offending record/account.
pub fn parse_records(values: Vec<Value>) -> Result<Vec<Record>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| parse_record(i + 1, value))
        .collect()
}

fn parse_record(position: usize, value: Value) -> Result<Record> {
    let invalid = |msg: String| VaultError::Validation(format!("record {position}: {msg}"));

    let Value::Object(map) = &value else {
        return Err(invalid("must be an object".into()));
    };
    if !map.contains_key("website") {
        return Err(invalid("missing 'website'".into()));
    }

    if let Some(accounts) = map.get("accounts") {
        let Value::Array(list) = accounts else {
            return Err(invalid("'accounts' must be a list".into()));
        };
        for (j, account) in list.iter().enumerate() {
            let Value::Object(fields) = account else {
                return Err(invalid(format!("account {} must be an object", j + 1)));
            };
            for field in ["username", "password"] {
                if !fields.contains_key(field) {
                    return Err(invalid(format!("account {} is missing '{field}'", j + 1)));
                }
            }
        }
        return serde_json::from_value(value)
            .map(Record::Current)
            .map_err(|e| invalid(e.to_string()));
    }

    if map.contains_key("username") || map.contains_key("password") {
        for field in ["username", "password"] {
            if !map.contains_key(field) {
                return Err(invalid(format!("missing '{field}'")));
            }
        }
        return serde_json::from_value(value)
            .map(Record::Legacy)
            .map_err(|e| invalid(e.to_string()));
    }

    Err(invalid("missing 'accounts'".into()))
}

/// Upgrade every legacy record; returns the records and how many changed.
pub fn migrate(records: Vec<Record>) -> (Vec<CurrentRecord>, usize) {
    let migrated = records.iter().filter(|r| r.is_legacy()).count();
    let current = records.into_iter().map(Record::into_current).collect();
    (current, migrated)
}

/// Validate current-shape records and build a vault from them.
///
/// Labels that normalize to the same key are combined; a repeated
/// username inside one site keeps the last occurrence.
pub fn build_vault(records: Vec<CurrentRecord>) -> Result<Vault> {
    let now = Utc::now();
    let mut vault = Vault::new();

    for (i, record) in records.into_iter().enumerate() {
        let invalid = |msg: String| VaultError::Validation(format!("record {}: {msg}", i + 1));

        let label = record.website.trim();
        if label.is_empty() {
            return Err(invalid("'website' cannot be empty".into()));
        }
        if record.accounts.is_empty() {
            return Err(invalid("'accounts' cannot be empty".into()));
        }

        let mut credentials = Vec::with_capacity(record.accounts.len());
        for (j, account) in record.accounts.iter().enumerate() {
            let username = account.username.trim();
            if username.is_empty() {
                return Err(invalid(format!("account {} has an empty username", j + 1)));
            }
            if account.password.is_empty() {
                return Err(invalid(format!("account {} has an empty password", j + 1)));
            }
            let created_at = parse_timestamp(account.created_time.as_deref())
                .map_err(|msg| invalid(format!("account {}: {msg}", j + 1)))?
                .unwrap_or(now);
            let modified_at = parse_timestamp(account.modified_time.as_deref())
                .map_err(|msg| invalid(format!("account {}: {msg}", j + 1)))?
                .unwrap_or(created_at);

            let credential = Credential {
                username: username.to_string(),
                secret: account.password.clone(),
                description: account.description.trim().to_string(),
                created_at,
                modified_at,
            };
            // A repeated username inside one record keeps the last one.
            match credentials
                .iter()
                .position(|c: &Credential| c.username == credential.username)
            {
                Some(idx) => credentials[idx] = credential,
                None => credentials.push(credential),
            }
        }

        vault.absorb_entry(WebsiteEntry {
            label: label.to_string(),
            credentials,
        });
    }

    Ok(vault)
}

/// Convert a vault back into current-shape records.
pub fn to_records(vault: &Vault) -> Vec<CurrentRecord> {
    vault
        .entries()
        .map(|entry| CurrentRecord {
            website: entry.label.clone(),
            accounts: entry
                .credentials
                .iter()
                .map(|c| AccountRecord {
                    username: c.username.clone(),
                    password: c.secret.clone(),
                    description: c.description.clone(),
                    created_time: Some(c.created_at.to_rfc3339()),
                    modified_time: Some(c.modified_at.to_rfc3339()),
                })
                .collect(),
        })
        .collect()
}

/// Accepts RFC 3339 or the naive `%Y-%m-%d %H:%M[:%S]` forms (taken as UTC).
pub fn parse_timestamp(raw: Option<&str>) -> std::result::Result<Option<DateTime<Utc>>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(Some(naive.and_utc()));
        }
    }
    Err(format!("unrecognized timestamp '{raw}'"))
}

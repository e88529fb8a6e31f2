//! In-memory credential store.
//!
//! `Vault` owns every `WebsiteEntry` in an insertion-ordered map keyed by
//! normalized label, and enforces the data-model invariants:
//! - no two entries share a normalized label,
//! - every entry has at least one credential,
//! - usernames are unique within an entry.
//!
//! It knows nothing about encryption; `VaultManager` serializes it with
//! `to_payload` and seals the bytes.

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::errors::{DecodeError, VaultError, Result};

use super::model::{normalize_label, Credential, CredentialUpdate, WebsiteEntry};
use super::records;

/// Schema version written into every payload.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Schema version of payloads that still hold flat legacy records.
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// How `Vault::merge` treats existing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Combine incoming entries with existing ones (last write wins).
    Merge,
    /// Discard the store and take the incoming vault as-is.
    Replace,
}

/// Counts produced by a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub entries_added: usize,
    pub entries_merged: usize,
    pub accounts_added: usize,
    pub accounts_updated: usize,
}

impl MergeReport {
    fn absorb(&mut self, other: MergeReport) {
        self.entries_added += other.entries_added;
        self.entries_merged += other.entries_merged;
        self.accounts_added += other.accounts_added;
        self.accounts_updated += other.accounts_updated;
    }
}

/// The full credential collection.
#[derive(Debug, Clone)]
pub struct Vault {
    version: u32,
    entries: IndexMap<String, WebsiteEntry>,
    dirty: bool,
}

impl Default for Vault {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Vault {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a == b)
    }
}

impl Vault {
    /// An empty vault at the current schema version.
    pub fn new() -> Self {
        Self {
            version: CURRENT_SCHEMA_VERSION,
            entries: IndexMap::new(),
            dirty: false,
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of entries (sites).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of credentials across all entries.
    pub fn account_count(&self) -> usize {
        self.entries.values().map(|e| e.credentials.len()).sum()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &WebsiteEntry> {
        self.entries.values()
    }

    /// Look up an entry by label (case-insensitive).
    pub fn entry(&self, label: &str) -> Option<&WebsiteEntry> {
        self.entries.get(&normalize_label(label))
    }

    /// Look up a single credential.
    pub fn credential(&self, label: &str, username: &str) -> Result<&Credential> {
        let username = username.trim();
        let entry = self
            .entry(label)
            .ok_or_else(|| VaultError::NotFound(format!("Entry '{}'", label.trim())))?;
        entry.credential(username).ok_or_else(|| {
            VaultError::NotFound(format!("Account '{username}' in '{}'", entry.label))
        })
    }

    /// `true` when there are changes not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Add a credential, creating the entry if the label is new.
    ///
    /// Fails with `DuplicateAccount` if the entry already has a
    /// credential with this username.
    pub fn add_credential(
        &mut self,
        label: &str,
        username: &str,
        secret: &str,
        description: &str,
    ) -> Result<()> {
        let label = validate_label(label)?;
        let username = validate_username(username)?;
        validate_secret(secret)?;

        let key = normalize_label(label);
        let credential = Credential::new(username, secret, description.trim());

        match self.entries.get_mut(&key) {
            Some(entry) => {
                if entry.position(username).is_some() {
                    return Err(VaultError::DuplicateAccount {
                        label: entry.label.clone(),
                        username: username.to_string(),
                    });
                }
                entry.credentials.push(credential);
            }
            None => {
                self.entries.insert(
                    key,
                    WebsiteEntry {
                        label: label.to_string(),
                        credentials: vec![credential],
                    },
                );
            }
        }

        self.dirty = true;
        Ok(())
    }

    /// Change fields of an existing credential and stamp `modified_at`.
    pub fn edit_credential(
        &mut self,
        label: &str,
        username: &str,
        update: CredentialUpdate,
    ) -> Result<()> {
        let username = username.trim();
        let key = normalize_label(label);
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| VaultError::NotFound(format!("Entry '{}'", label.trim())))?;
        let idx = entry.position(username).ok_or_else(|| {
            VaultError::NotFound(format!("Account '{username}' in '{}'", entry.label))
        })?;

        let new_username = match update.username.as_deref() {
            Some(name) => {
                let name = validate_username(name)?;
                if name != username && entry.position(name).is_some() {
                    return Err(VaultError::DuplicateAccount {
                        label: entry.label.clone(),
                        username: name.to_string(),
                    });
                }
                Some(name.to_string())
            }
            None => None,
        };
        if let Some(secret) = update.secret.as_deref() {
            validate_secret(secret)?;
        }

        let credential = &mut entry.credentials[idx];
        if let Some(name) = new_username {
            credential.username = name;
        }
        if let Some(secret) = update.secret {
            zeroize::Zeroize::zeroize(&mut credential.secret);
            credential.secret = secret;
        }
        if let Some(description) = update.description {
            credential.description = description.trim().to_string();
        }
        credential.modified_at = Utc::now();

        self.dirty = true;
        Ok(())
    }

    /// Remove one credential; an entry left empty is removed as well.
    pub fn remove_credential(&mut self, label: &str, username: &str) -> Result<()> {
        let username = username.trim();
        let key = normalize_label(label);
        let entry = self
            .entries
            .get_mut(&key)
            .ok_or_else(|| VaultError::NotFound(format!("Entry '{}'", label.trim())))?;
        let idx = entry.position(username).ok_or_else(|| {
            VaultError::NotFound(format!("Account '{username}' in '{}'", entry.label))
        })?;

        entry.credentials.remove(idx);
        if entry.credentials.is_empty() {
            self.entries.shift_remove(&key);
        }

        self.dirty = true;
        Ok(())
    }

    /// Remove an entry and all of its credentials.
    pub fn remove_entry(&mut self, label: &str) -> Result<()> {
        if self.entries.shift_remove(&normalize_label(label)).is_none() {
            return Err(VaultError::NotFound(format!("Entry '{}'", label.trim())));
        }
        self.dirty = true;
        Ok(())
    }

    /// Case-insensitive search over labels and usernames.
    ///
    /// The returned iterator is lazy; clone it to restart the search.
    /// An empty query yields every entry.
    pub fn find<'a>(&'a self, query: &str) -> Find<'a> {
        Find {
            entries: self.entries.values(),
            needle: query.trim().to_lowercase(),
        }
    }

    /// Fold another vault into this one.
    ///
    /// `Replace` discards the current contents.  `Merge` adds unknown
    /// entries wholesale, and for known entries overwrites credentials
    /// with matching usernames and appends the rest.
    pub fn merge(&mut self, other: Vault, policy: MergePolicy) -> MergeReport {
        match policy {
            MergePolicy::Replace => {
                let report = MergeReport {
                    entries_added: other.len(),
                    accounts_added: other.account_count(),
                    ..MergeReport::default()
                };
                self.entries = other.entries;
                self.version = CURRENT_SCHEMA_VERSION;
                self.dirty = true;
                report
            }
            MergePolicy::Merge => {
                let mut report = MergeReport::default();
                for (_, entry) in other.entries {
                    report.absorb(self.absorb_entry(entry));
                }
                report
            }
        }
    }

    /// Merge a single entry into the store.
    pub(crate) fn absorb_entry(&mut self, incoming: WebsiteEntry) -> MergeReport {
        let mut report = MergeReport::default();
        let key = incoming.key();

        match self.entries.get_mut(&key) {
            None => {
                report.entries_added = 1;
                report.accounts_added = incoming.credentials.len();
                self.entries.insert(key, incoming);
                self.dirty = true;
            }
            Some(existing) => {
                report.entries_merged = 1;
                for credential in incoming.credentials {
                    match existing.position(&credential.username) {
                        Some(idx) => {
                            if existing.credentials[idx].overwrite_from(&credential) {
                                report.accounts_updated += 1;
                                self.dirty = true;
                            }
                        }
                        None => {
                            existing.credentials.push(credential);
                            report.accounts_added += 1;
                            self.dirty = true;
                        }
                    }
                }
            }
        }

        report
    }

    // ------------------------------------------------------------------
    // Payload serialization
    // ------------------------------------------------------------------

    /// Serialize to the JSON payload that gets encrypted.
    pub fn to_payload(&self) -> Result<Zeroizing<Vec<u8>>> {
        let payload = PayloadRef {
            version: CURRENT_SCHEMA_VERSION,
            entries: self.entries.values().collect(),
        };
        serde_json::to_vec(&payload)
            .map(Zeroizing::new)
            .map_err(|e| VaultError::SerializationError(format!("vault payload: {e}")))
    }

    /// Parse a decrypted payload, migrating legacy schemas.
    ///
    /// A migrated vault comes back dirty so the next save persists the
    /// upgrade.
    pub fn from_payload(bytes: &[u8]) -> Result<Self> {
        let schema: SchemaVersion = serde_json::from_slice(bytes)
            .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

        match schema.version {
            CURRENT_SCHEMA_VERSION => {
                let payload: CurrentPayload = serde_json::from_slice(bytes)
                    .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;
                Self::from_entries(payload.entries)
            }
            LEGACY_SCHEMA_VERSION => {
                let payload: LegacyPayload = serde_json::from_slice(bytes)
                    .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;
                let parsed = records::parse_records(payload.entries)
                    .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;
                let (current, migrated) = records::migrate(parsed);
                let mut vault = records::build_vault(current)
                    .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;
                tracing::info!(migrated, "upgraded legacy vault payload");
                vault.dirty = true;
                Ok(vault)
            }
            other => Err(DecodeError::MalformedPayload(format!(
                "unsupported schema version {other}"
            ))
            .into()),
        }
    }

    /// Rebuild from stored entries, checking every invariant.
    fn from_entries(entries: Vec<WebsiteEntry>) -> Result<Self> {
        let mut vault = Self::new();
        for entry in entries {
            let malformed = |msg: String| VaultError::from(DecodeError::MalformedPayload(msg));

            if entry.label.trim().is_empty() {
                return Err(malformed("entry with empty label".into()));
            }
            if entry.credentials.is_empty() {
                return Err(malformed(format!("entry '{}' has no credentials", entry.label)));
            }
            for (i, c) in entry.credentials.iter().enumerate() {
                if c.username.trim().is_empty() || c.secret.is_empty() {
                    return Err(malformed(format!(
                        "entry '{}' credential {} is incomplete",
                        entry.label,
                        i + 1
                    )));
                }
                if entry.credentials[..i].iter().any(|p| p.username == c.username) {
                    return Err(malformed(format!(
                        "entry '{}' has duplicate username",
                        entry.label
                    )));
                }
            }

            let key = entry.key();
            if vault.entries.contains_key(&key) {
                return Err(malformed(format!("duplicate label '{}'", entry.label)));
            }
            vault.entries.insert(key, entry);
        }
        Ok(vault)
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// One search hit: an entry plus the credentials that matched.
#[derive(Debug, Clone)]
pub struct EntryMatch<'a> {
    pub entry: &'a WebsiteEntry,
    pub credentials: Vec<&'a Credential>,
}

/// Lazy search iterator returned by `Vault::find`.
#[derive(Clone)]
pub struct Find<'a> {
    entries: indexmap::map::Values<'a, String, WebsiteEntry>,
    needle: String,
}

impl<'a> Iterator for Find<'a> {
    type Item = EntryMatch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            // A label hit (or an empty query) returns the whole entry.
            if self.needle.is_empty() || entry.label.to_lowercase().contains(&self.needle) {
                return Some(EntryMatch {
                    entry,
                    credentials: entry.credentials.iter().collect(),
                });
            }

            let credentials: Vec<&Credential> = entry
                .credentials
                .iter()
                .filter(|c| c.username.to_lowercase().contains(&self.needle))
                .collect();
            if !credentials.is_empty() {
                return Some(EntryMatch { entry, credentials });
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Payload shapes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PayloadRef<'a> {
    version: u32,
    entries: Vec<&'a WebsiteEntry>,
}

#[derive(Deserialize)]
struct SchemaVersion {
    version: u32,
}

#[derive(Deserialize)]
struct CurrentPayload {
    entries: Vec<WebsiteEntry>,
}

#[derive(Deserialize)]
struct LegacyPayload {
    entries: Vec<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_label(label: &str) -> Result<&str> {
    let label = label.trim();
    if label.is_empty() {
        return Err(VaultError::Validation("label cannot be empty".into()));
    }
    Ok(label)
}

fn validate_username(username: &str) -> Result<&str> {
    let username = username.trim();
    if username.is_empty() {
        return Err(VaultError::Validation("username cannot be empty".into()));
    }
    Ok(username)
}

fn validate_secret(secret: &str) -> Result<()> {
    if secret.is_empty() {
        return Err(VaultError::Validation("secret cannot be empty".into()));
    }
    Ok(())
}

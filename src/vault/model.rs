//! Credential and WebsiteEntry types stored inside a vault.
//!
//! A `WebsiteEntry` groups every login for one site or application.
//! Its credentials keep insertion order; the first one is the primary
//! account shown in listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A single login record.
///
/// The secret and username are wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    pub username: String,

    pub secret: String,

    #[serde(default)]
    pub description: String,

    #[zeroize(skip)]
    pub created_at: DateTime<Utc>,

    #[zeroize(skip)]
    pub modified_at: DateTime<Utc>,
}

impl Credential {
    /// A new credential stamped with the current time.
    pub fn new(username: &str, secret: &str, description: &str) -> Self {
        let now = Utc::now();
        Self {
            username: username.to_string(),
            secret: secret.to_string(),
            description: description.to_string(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Copy the user-editable fields from `other`.
    ///
    /// Returns `true` (and stamps `modified_at`) only if something changed.
    pub(crate) fn overwrite_from(&mut self, other: &Credential) -> bool {
        if self.secret == other.secret && self.description == other.description {
            return false;
        }
        self.secret.zeroize();
        self.secret = other.secret.clone();
        self.description = other.description.clone();
        self.modified_at = Utc::now().max(other.modified_at);
        true
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("description", &self.description)
            .field("created_at", &self.created_at)
            .field("modified_at", &self.modified_at)
            .finish()
    }
}

/// All credentials for one logical site/application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteEntry {
    /// Display label, as first entered (trimmed).
    pub label: String,

    /// Never empty while the entry is inside a vault.
    pub credentials: Vec<Credential>,
}

impl WebsiteEntry {
    /// The lookup key for this entry.
    pub fn key(&self) -> String {
        normalize_label(&self.label)
    }

    /// The first ("primary") credential.
    pub fn primary(&self) -> Option<&Credential> {
        self.credentials.first()
    }

    /// Find a credential by username. Surrounding whitespace is ignored,
    /// matching how usernames are stored.
    pub fn credential(&self, username: &str) -> Option<&Credential> {
        self.position(username).map(|idx| &self.credentials[idx])
    }

    pub(crate) fn position(&self, username: &str) -> Option<usize> {
        let username = username.trim();
        self.credentials.iter().position(|c| c.username == username)
    }
}

/// Field changes for `Vault::edit_credential`. `None` leaves a field alone.
#[derive(Debug, Default, Clone)]
pub struct CredentialUpdate {
    pub username: Option<String>,
    pub secret: Option<String>,
    pub description: Option<String>,
}

impl CredentialUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.secret.is_none() && self.description.is_none()
    }
}

/// Case-insensitive label matching rule: trim, then lower-case.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_label("  GitHub.com "), "github.com");
        assert_eq!(normalize_label("github.com"), normalize_label("GITHUB.COM"));
    }

    #[test]
    fn debug_redacts_secret() {
        let cred = Credential::new("alice", "hunter2", "");
        let shown = format!("{cred:?}");
        assert!(shown.contains("alice"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn overwrite_reports_change_only_when_fields_differ() {
        let mut a = Credential::new("alice", "one", "work");
        let same = a.clone();
        assert!(!a.overwrite_from(&same));

        let newer = Credential::new("alice", "two", "work");
        assert!(a.overwrite_from(&newer));
        assert_eq!(a.secret, "two");
        assert!(a.modified_at >= a.created_at);
    }

    #[test]
    fn primary_is_first_credential() {
        let entry = WebsiteEntry {
            label: "Example".into(),
            credentials: vec![Credential::new("a", "1", ""), Credential::new("b", "2", "")],
        };
        assert_eq!(entry.primary().unwrap().username, "a");
        assert_eq!(entry.position("b"), Some(1));
        assert!(entry.credential("c").is_none());
        assert_eq!(entry.key(), "example");
    }
}

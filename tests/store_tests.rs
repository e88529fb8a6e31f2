//! Integration tests for the in-memory credential store.

use std::collections::HashSet;

use passvault::errors::VaultError;
use passvault::vault::{normalize_label, CredentialUpdate, MergePolicy, Vault};

fn populated() -> Vault {
    let mut v = Vault::new();
    v.add_credential("github.com", "alice", "pw-a", "personal").unwrap();
    v.add_credential("GitHub.com", "bob", "pw-b", "").unwrap();
    v.add_credential("mail.example", "carol", "pw-c", "").unwrap();
    v
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[test]
fn labels_stay_unique_after_any_adds() {
    let mut v = Vault::new();
    let labels = ["Site", "site", " SITE ", "other", "Other", "site"];
    for (i, label) in labels.iter().enumerate() {
        let _ = v.add_credential(label, &format!("user{i}"), "pw", "");
    }

    let keys: Vec<String> = v.entries().map(|e| normalize_label(&e.label)).collect();
    let unique: HashSet<&String> = keys.iter().collect();
    assert_eq!(keys.len(), unique.len());
    assert_eq!(v.len(), 2);
    assert_eq!(v.account_count(), labels.len());
}

#[test]
fn duplicate_username_in_entry_is_rejected() {
    let mut v = populated();
    let err = v.add_credential("GITHUB.COM", "alice", "x", "").unwrap_err();
    assert!(matches!(err, VaultError::DuplicateAccount { .. }));
    assert_eq!(v.account_count(), 3);
}

#[test]
fn empty_fields_are_validation_errors() {
    let mut v = Vault::new();
    assert!(matches!(v.add_credential("  ", "u", "p", ""), Err(VaultError::Validation(_))));
    assert!(matches!(v.add_credential("l", " ", "p", ""), Err(VaultError::Validation(_))));
    assert!(matches!(v.add_credential("l", "u", "", ""), Err(VaultError::Validation(_))));
    assert!(v.is_empty());
}

#[test]
fn padded_username_finds_the_stored_account() {
    let mut v = Vault::new();
    v.add_credential("site", " alice ", "pw", "").unwrap();
    assert_eq!(v.credential("site", "alice").unwrap().username, "alice");
    assert!(v.credential("site", " alice").is_ok());

    v.edit_credential(
        "site",
        " alice",
        CredentialUpdate {
            description: Some("work".into()),
            ..CredentialUpdate::default()
        },
    )
    .unwrap();
    assert_eq!(v.credential("site", "alice").unwrap().description, "work");

    v.remove_credential("site", "alice  ").unwrap();
    assert!(v.is_empty());
}

#[test]
fn removing_last_credential_removes_entry() {
    let mut v = populated();
    v.remove_credential("mail.example", "carol").unwrap();
    assert!(v.entry("mail.example").is_none());

    v.remove_credential("github.com", "alice").unwrap();
    let entry = v.entry("github.com").unwrap();
    assert_eq!(entry.primary().unwrap().username, "bob");
}

#[test]
fn remove_missing_is_not_found() {
    let mut v = populated();
    assert!(matches!(v.remove_credential("nope", "x"), Err(VaultError::NotFound(_))));
    assert!(matches!(v.remove_credential("github.com", "zed"), Err(VaultError::NotFound(_))));
    assert!(matches!(v.remove_entry("nope"), Err(VaultError::NotFound(_))));
}

#[test]
fn edit_updates_fields_and_stamps_modified() {
    let mut v = populated();
    let before = v.credential("github.com", "alice").unwrap().modified_at;

    v.edit_credential(
        "github.com",
        "alice",
        CredentialUpdate {
            username: Some("alice2".into()),
            secret: Some("rotated".into()),
            description: None,
        },
    )
    .unwrap();

    let cred = v.credential("github.com", "alice2").unwrap();
    assert_eq!(cred.secret, "rotated");
    assert_eq!(cred.description, "personal");
    assert!(cred.modified_at >= before);
    assert!(v.credential("github.com", "alice").is_err());
}

#[test]
fn edit_rename_onto_existing_username_fails() {
    let mut v = populated();
    let err = v
        .edit_credential(
            "github.com",
            "alice",
            CredentialUpdate {
                username: Some("bob".into()),
                ..CredentialUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, VaultError::DuplicateAccount { .. }));
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[test]
fn find_is_case_insensitive_and_restartable() {
    let v = populated();
    let search = v.find("ALI");

    let first: Vec<_> = search.clone().collect();
    let second: Vec<_> = search.collect();
    assert_eq!(first.len(), 1);
    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].credentials.len(), 1);
    assert_eq!(first[0].credentials[0].username, "alice");
}

#[test]
fn empty_query_yields_everything_in_order() {
    let v = populated();
    let labels: Vec<&str> = v.find("").map(|m| m.entry.label.as_str()).collect();
    assert_eq!(labels, ["github.com", "mail.example"]);
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[test]
fn merging_identical_copy_changes_nothing() {
    let mut v = populated();
    let before = v.clone();

    let report = v.merge(before.clone(), MergePolicy::Merge);
    assert_eq!(report.entries_added, 0);
    assert_eq!(report.accounts_added, 0);
    assert!(report.accounts_updated <= before.account_count());
    assert_eq!(v, before);
}

#[test]
fn merge_last_write_wins_and_appends() {
    let mut v = populated();
    let mut incoming = Vault::new();
    incoming.add_credential("GITHUB.COM", "alice", "newer", "personal").unwrap();
    incoming.add_credential("github.com", "dave", "pw-d", "").unwrap();
    incoming.add_credential("new.example", "erin", "pw-e", "").unwrap();

    let report = v.merge(incoming, MergePolicy::Merge);
    assert_eq!(report.entries_added, 1);
    assert_eq!(report.entries_merged, 1);
    assert_eq!(report.accounts_added, 2);
    assert_eq!(report.accounts_updated, 1);
    assert_eq!(v.credential("github.com", "alice").unwrap().secret, "newer");
    assert_eq!(v.entry("github.com").unwrap().credentials.len(), 3);
}

#[test]
fn replace_discards_existing_contents() {
    let mut v = populated();
    let mut incoming = Vault::new();
    incoming.add_credential("only.example", "u", "p", "").unwrap();

    let report = v.merge(incoming, MergePolicy::Replace);
    assert_eq!(report.entries_added, 1);
    assert_eq!(v.len(), 1);
    assert!(v.entry("github.com").is_none());
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[test]
fn payload_roundtrip_preserves_everything() {
    let v = populated();
    let payload = v.to_payload().unwrap();
    let back = Vault::from_payload(&payload).unwrap();
    assert_eq!(back, v);
    assert!(!back.is_dirty());
}

#[test]
fn payload_with_unknown_schema_is_rejected() {
    let err = Vault::from_payload(br#"{"version": 99, "entries": []}"#).unwrap_err();
    assert!(matches!(err, VaultError::Decode(_)));
}

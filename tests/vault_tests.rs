//! Integration tests for the vault lifecycle (`VaultManager`).

use std::fs;
use std::path::PathBuf;

use passvault::crypto::Argon2Params;
use passvault::errors::{AuthError, DecodeError, VaultError};
use passvault::vault::envelope::{self, temp_path};
use passvault::vault::{CredentialUpdate, VaultManager, VaultState};
use tempfile::TempDir;
use zeroize::Zeroizing;

const PASS: &str = "Tr0ub4dor&3";

/// Helper: a vault path inside a fresh temp dir.
fn vault_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.vault");
    (dir, path)
}

fn manager(path: &PathBuf) -> VaultManager {
    VaultManager::new(path).with_kdf_params(Argon2Params::minimum())
}

fn created(path: &PathBuf) -> VaultManager {
    let mut m = manager(path);
    m.create(PASS).expect("create vault");
    m
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn create_add_save_lock_unlock() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);

    m.add_credential("github.com", "alice", "secretpw", "").unwrap();
    m.save().unwrap();
    m.lock();
    assert_eq!(m.state(), VaultState::Locked);
    assert!(m.vault().is_err());

    let vault = m.unlock(PASS).unwrap();
    assert_eq!(vault.len(), 1);
    let entry = vault.entry("github.com").unwrap();
    assert_eq!(entry.credentials.len(), 1);
    assert_eq!(entry.credentials[0].username, "alice");
    assert_eq!(entry.credentials[0].secret, "secretpw");
}

#[test]
fn wrong_passphrase_stays_locked() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    m.add_credential("github.com", "alice", "secretpw", "").unwrap();
    m.save().unwrap();
    m.lock();

    let err = m.unlock("wrong").unwrap_err();
    assert!(matches!(err, VaultError::Auth(AuthError::VerificationFailed)));
    assert_eq!(m.state(), VaultState::Locked);
    assert!(matches!(m.vault(), Err(VaultError::VaultLocked)));

    // The lock file was released, so a correct retry works.
    assert!(m.unlock(PASS).is_ok());
}

#[test]
fn wrong_passphrase_and_corruption_look_the_same() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    m.add_credential("a", "b", "c", "").unwrap();
    m.save().unwrap();
    m.lock();

    let wrong = m.unlock("Wr0ng&Passphrase").unwrap_err().to_string();

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x80;
    fs::write(&path, &bytes).unwrap();
    let corrupt = m.unlock(PASS).unwrap_err().to_string();

    assert_eq!(wrong, corrupt);
}

#[test]
fn reopen_from_a_fresh_manager() {
    let (_dir, path) = vault_path();
    {
        let mut m = created(&path);
        m.add_credential("mail.example", "carol", "pw", "work").unwrap();
        m.save().unwrap();
    }

    let mut m = manager(&path);
    assert_eq!(m.state(), VaultState::Locked);
    let cred = m.unlock(PASS).unwrap().credential("MAIL.EXAMPLE", "carol").unwrap();
    assert_eq!(cred.description, "work");
}

// ---------------------------------------------------------------------------
// Tamper detection
// ---------------------------------------------------------------------------

#[test]
fn any_flipped_bit_after_the_prefix_fails_unlock() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    m.add_credential("github.com", "alice", "secretpw", "").unwrap();
    m.save().unwrap();
    m.lock();

    let original = fs::read(&path).unwrap();
    let env = envelope::decode(&original).unwrap();
    let body_start = original.len() - env.ciphertext().len() - env.nonce().len();

    // Nonce, ciphertext and tag: every byte, one bit each.
    for i in body_start..original.len() {
        let mut bytes = original.clone();
        bytes[i] ^= 0x01;
        fs::write(&path, &bytes).unwrap();
        let err = m.unlock(PASS).unwrap_err();
        assert!(
            matches!(err, VaultError::Auth(_)),
            "byte {i} flip gave {err:?}"
        );
        assert_eq!(m.state(), VaultState::Locked);
    }
}

#[test]
fn header_tampering_fails_closed() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    m.save().unwrap();
    m.lock();

    let original = fs::read(&path).unwrap();
    let text = String::from_utf8_lossy(&original).into_owned();
    // Rewrite the first digit of the creation year; still valid JSON.
    let idx = text.find("\"created_at\":\"").unwrap() + 14;
    let mut bytes = original.clone();
    bytes[idx] = if bytes[idx] == b'1' { b'2' } else { b'1' };
    fs::write(&path, &bytes).unwrap();

    assert!(matches!(m.unlock(PASS), Err(VaultError::Auth(_))));
}

/// Splice a new header JSON into the file, fixing up `header_len`.
fn rewrite_header(path: &PathBuf, edit: impl Fn(&str) -> String) {
    let bytes = fs::read(path).unwrap();
    let len = u32::from_le_bytes(bytes[5..9].try_into().unwrap()) as usize;
    let header = std::str::from_utf8(&bytes[9..9 + len]).unwrap();
    let edited = edit(header);
    assert_ne!(edited, header, "edit did not change the header");

    let mut out = bytes[..5].to_vec();
    out.extend_from_slice(&(edited.len() as u32).to_le_bytes());
    out.extend_from_slice(edited.as_bytes());
    out.extend_from_slice(&bytes[9 + len..]);
    fs::write(path, out).unwrap();
}

#[test]
fn inflated_kdf_cost_in_header_fails_closed() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    m.lock();
    let original = fs::read(&path).unwrap();

    for (field, value) in [
        ("\"memory_kib\":8192", "\"memory_kib\":4000000000"),
        ("\"iterations\":1", "\"iterations\":4000000000"),
        ("\"parallelism\":1", "\"parallelism\":100000"),
    ] {
        fs::write(&path, &original).unwrap();
        rewrite_header(&path, |h| h.replace(field, value));

        let err = m.unlock(PASS).unwrap_err();
        assert!(
            matches!(err, VaultError::Decode(DecodeError::MalformedHeader(_))),
            "{value} gave {err:?}"
        );
        assert_eq!(m.state(), VaultState::Locked);
    }
}

#[test]
fn shortened_salt_in_header_fails_closed() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    m.lock();

    // "AAAA" is three zero bytes in base64.
    rewrite_header(&path, |h| {
        let start = h.find("\"salt\":\"").unwrap() + 8;
        let end = start + h[start..].find('"').unwrap();
        format!("{}AAAA{}", &h[..start], &h[end..])
    });

    assert!(matches!(
        m.unlock(PASS),
        Err(VaultError::Decode(DecodeError::MalformedHeader(_)))
    ));
    assert_eq!(m.state(), VaultState::Locked);
}

#[test]
fn garbage_file_is_a_decode_error() {
    let (_dir, path) = vault_path();
    fs::write(&path, b"definitely not a vault").unwrap();

    let mut m = manager(&path);
    assert!(matches!(
        m.unlock(PASS),
        Err(VaultError::Decode(DecodeError::BadMagic))
    ));
}

// ---------------------------------------------------------------------------
// Durability
// ---------------------------------------------------------------------------

#[test]
fn crash_before_rename_leaves_previous_vault_intact() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    m.add_credential("github.com", "alice", "secretpw", "").unwrap();
    m.save().unwrap();
    m.lock();

    // A save that died after writing part of the temp file.
    fs::write(temp_path(&path), b"PVLT\x01half-written").unwrap();

    let vault = m.unlock(PASS).unwrap();
    assert_eq!(vault.credential("github.com", "alice").unwrap().secret, "secretpw");

    // The next save overwrites the stale temp file and cleans it up.
    m.add_credential("github.com", "bob", "pw2", "").unwrap();
    m.save().unwrap();
    assert!(!temp_path(&path).exists());
}

#[test]
fn each_save_uses_a_fresh_nonce() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    let first = envelope::read_envelope(&path).unwrap();
    m.save().unwrap();
    let second = envelope::read_envelope(&path).unwrap();
    assert_ne!(first.nonce(), second.nonce());
    assert_eq!(first.header(), second.header());
}

#[test]
fn lock_discards_unsaved_changes() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    m.add_credential("a.example", "u", "p", "").unwrap();
    assert!(m.is_dirty());
    m.lock();

    assert!(m.unlock(PASS).unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Lifecycle guards
// ---------------------------------------------------------------------------

#[test]
fn create_over_existing_vault_fails() {
    let (_dir, path) = vault_path();
    drop(created(&path));
    let mut m = manager(&path);
    assert!(matches!(m.create(PASS), Err(VaultError::VaultAlreadyExists(_))));
}

#[test]
fn unlock_without_vault_is_not_found() {
    let (_dir, path) = vault_path();
    let mut m = manager(&path);
    assert!(matches!(m.unlock(PASS), Err(VaultError::VaultNotFound(_))));
}

#[test]
fn second_manager_is_busy_while_first_is_unlocked() {
    let (_dir, path) = vault_path();
    let mut first = created(&path);

    let mut second = manager(&path);
    assert!(matches!(second.unlock(PASS), Err(VaultError::VaultBusy(_))));
    assert_eq!(second.state(), VaultState::Locked);

    first.lock();
    assert!(second.unlock(PASS).is_ok());
}

// ---------------------------------------------------------------------------
// Keyfile, rotation, edits
// ---------------------------------------------------------------------------

#[test]
fn keyfile_is_required_once_configured() {
    let (dir, path) = vault_path();
    let kf_path = dir.path().join("vault.keyfile");
    let keyfile = passvault::crypto::generate_keyfile(&kf_path).unwrap();

    {
        let mut m = manager(&path).with_keyfile(keyfile.clone());
        m.create(PASS).unwrap();
    }

    let mut without = manager(&path);
    assert!(matches!(without.unlock(PASS), Err(VaultError::KeyfileError(_))));

    let mut wrong = manager(&path).with_keyfile(Zeroizing::new(vec![9u8; 32]));
    assert!(matches!(wrong.unlock(PASS), Err(VaultError::Auth(_))));
    drop(wrong);
    drop(without);

    let mut right = manager(&path).with_keyfile(keyfile);
    assert!(right.unlock(PASS).is_ok());
}

#[test]
fn change_passphrase_rekeys_the_vault() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    m.add_credential("github.com", "alice", "secretpw", "").unwrap();
    m.save().unwrap();
    let old_salt = envelope::read_envelope(&path).unwrap().header().kdf.salt.clone();

    m.change_passphrase("N3w-Passphrase!").unwrap();
    let new_salt = envelope::read_envelope(&path).unwrap().header().kdf.salt.clone();
    assert_ne!(old_salt, new_salt);
    m.lock();

    assert!(m.unlock(PASS).is_err());
    let vault = m.unlock("N3w-Passphrase!").unwrap();
    assert_eq!(vault.credential("github.com", "alice").unwrap().secret, "secretpw");
}

#[test]
fn change_passphrase_rejects_weak_passphrase() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    assert!(matches!(
        m.change_passphrase("abc"),
        Err(VaultError::WeakPassphrase(_))
    ));
    m.lock();
    assert!(m.unlock(PASS).is_ok());
}

#[test]
fn edit_and_remove_through_the_manager() {
    let (_dir, path) = vault_path();
    let mut m = created(&path);
    m.add_credential("github.com", "alice", "one", "").unwrap();
    m.add_credential("github.com", "bob", "two", "").unwrap();
    m.edit_credential(
        "github.com",
        "alice",
        CredentialUpdate {
            secret: Some("three".into()),
            ..CredentialUpdate::default()
        },
    )
    .unwrap();
    m.remove_credential("github.com", "bob").unwrap();
    m.save().unwrap();
    m.lock();

    let vault = m.unlock(PASS).unwrap();
    assert_eq!(vault.account_count(), 1);
    assert_eq!(vault.credential("github.com", "alice").unwrap().secret, "three");

    m.remove_entry("github.com").unwrap();
    assert_eq!(m.find("").unwrap().count(), 0);
}

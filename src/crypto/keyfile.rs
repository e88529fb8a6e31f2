//! Keyfile second factor.
//!
//! A keyfile is a 32-byte random file.  When a vault is created with a
//! keyfile, both the passphrase and the keyfile are required to derive
//! the master key: `HMAC-SHA256(keyfile_bytes, passphrase)` is fed to
//! Argon2id instead of the raw passphrase.
//!
//! The vault header only records *that* a keyfile is required.  A wrong
//! keyfile is reported exactly like a wrong passphrase.

use std::fs;
use std::path::Path;

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::{VaultError, Result};

/// Expected length of a keyfile in bytes (256 bits).
pub const KEYFILE_LEN: usize = 32;

/// Generate a new random keyfile and write it to `path` (owner-only on Unix).
pub fn generate_keyfile(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    if path.exists() {
        return Err(VaultError::KeyfileError(format!(
            "keyfile already exists at {}",
            path.display()
        )));
    }

    let mut keyfile = Zeroizing::new(vec![0u8; KEYFILE_LEN]);
    rand::rng().fill_bytes(&mut keyfile);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                VaultError::KeyfileError(format!("cannot create keyfile directory: {e}"))
            })?;
        }
    }

    fs::write(path, keyfile.as_slice())
        .map_err(|e| VaultError::KeyfileError(format!("failed to write keyfile: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            VaultError::KeyfileError(format!("failed to set keyfile permissions: {e}"))
        })?;
    }

    tracing::debug!(path = %path.display(), "generated keyfile");
    Ok(keyfile)
}

/// Load a keyfile from disk and validate its length.
pub fn load_keyfile(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    if !path.exists() {
        return Err(VaultError::KeyfileError(format!(
            "keyfile not found at {}",
            path.display()
        )));
    }

    let data = Zeroizing::new(
        fs::read(path)
            .map_err(|e| VaultError::KeyfileError(format!("failed to read keyfile: {e}")))?,
    );

    if data.len() != KEYFILE_LEN {
        return Err(VaultError::KeyfileError(format!(
            "keyfile must be exactly {} bytes, got {}",
            KEYFILE_LEN,
            data.len()
        )));
    }

    Ok(data)
}

/// Combine a passphrase and keyfile into a single effective passphrase.
pub fn combine_password_keyfile(password: &[u8], keyfile_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(keyfile_bytes)
        .map_err(|e| VaultError::KeyfileError(format!("HMAC init failed: {e}")))?;

    mac.update(password);

    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generate_and_load_keyfile_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.keyfile");

        let generated = generate_keyfile(&path).unwrap();
        assert_eq!(generated.len(), KEYFILE_LEN);

        let loaded = load_keyfile(&path).unwrap();
        assert_eq!(generated.as_slice(), loaded.as_slice());
    }

    #[test]
    fn generate_keyfile_fails_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.keyfile");

        generate_keyfile(&path).unwrap();
        assert!(generate_keyfile(&path).is_err());
    }

    #[test]
    fn load_keyfile_fails_on_wrong_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.keyfile");
        fs::write(&path, [0u8; 16]).unwrap();

        let err = load_keyfile(&path).unwrap_err();
        assert!(err.to_string().contains("exactly 32 bytes"), "{err}");
    }

    #[test]
    fn combine_depends_on_both_inputs() {
        let a = combine_password_keyfile(b"pw", &[0xAB; 32]).unwrap();
        let b = combine_password_keyfile(b"pw", &[0xCD; 32]).unwrap();
        let c = combine_password_keyfile(b"other", &[0xAB; 32]).unwrap();
        assert_eq!(a, combine_password_keyfile(b"pw", &[0xAB; 32]).unwrap());
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[cfg(unix)]
    #[test]
    fn keyfile_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.keyfile");
        generate_keyfile(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

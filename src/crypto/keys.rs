//! Key material handling.
//!
//! The Argon2id output is the *master key*.  The key that actually feeds
//! AES-256-GCM is expanded from it with HKDF-SHA256 under a fixed
//! context string, so the raw KDF output is never used as a cipher key.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{VaultError, Result};

use super::kdf::{self, KdfParams, KEY_LEN};
use super::keyfile;

/// HKDF `info` label binding the expanded key to vault-payload encryption.
const VAULT_KEY_INFO: &[u8] = b"passvault-payload-key-v1";

/// A 32-byte key that zeroes its memory when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Run the KDF and wrap the result.
    ///
    /// When `keyfile_bytes` is present the passphrase is first combined
    /// with the keyfile (`HMAC-SHA256(keyfile, passphrase)`).
    pub fn derive(
        passphrase: &[u8],
        keyfile_bytes: Option<&[u8]>,
        params: &KdfParams,
    ) -> Result<Self> {
        let mut effective = match keyfile_bytes {
            Some(kf) => keyfile::combine_password_keyfile(passphrase, kf)?,
            None => passphrase.to_vec(),
        };
        let derived = kdf::derive_key(&effective, params);
        effective.zeroize();

        let mut bytes = derived?;
        let key = Self::new(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Expand the AEAD key used to seal the vault payload.
    pub fn vault_key(&self) -> Result<MasterKey> {
        derive_vault_key(&self.bytes).map(MasterKey::new)
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

/// Expand the payload-encryption key from a master key.
pub fn derive_vault_key(master_key: &[u8]) -> Result<[u8; KEY_LEN]> {
    hkdf_derive(master_key, VAULT_KEY_INFO)
}

/// Internal helper: run HKDF-SHA256 expand with the given `info`.
///
/// No salt: the master key already has full entropy (it came from Argon2id).
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

//! AES-256-GCM authenticated encryption of the vault payload.
//!
//! `seal` draws a fresh random 12-byte nonce on every call, so a caller
//! can never reuse one with the same key.  `open` fails closed: a wrong
//! key, a flipped bit anywhere in nonce/ciphertext/tag/associated data,
//! or a truncated buffer all produce `AuthError::VerificationFailed`.
//! Tag comparison inside `aes-gcm` is constant-time.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use zeroize::Zeroizing;

use crate::errors::{AuthError, VaultError, Result};

use super::kdf::KEY_LEN;

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// Output of a `seal` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the 16-byte tag appended.
    pub ciphertext: Vec<u8>,
}

/// Encrypt and authenticate `plaintext` under `key`.
///
/// `aad` is authenticated but not encrypted (the envelope header).
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(&nonce);

    Ok(Sealed {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Verify and decrypt a buffer produced by `seal`.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> std::result::Result<Zeroizing<Vec<u8>>, AuthError> {
    if ciphertext.len() < TAG_LEN {
        return Err(AuthError::VerificationFailed);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| AuthError::VerificationFailed)?;

    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| AuthError::VerificationFailed)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip_with_aad() {
        let key = [0x11u8; KEY_LEN];
        let sealed = seal(&key, b"payload", b"header").unwrap();
        assert_eq!(sealed.ciphertext.len(), b"payload".len() + TAG_LEN);

        let plain = open(&key, &sealed.nonce, &sealed.ciphertext, b"header").unwrap();
        assert_eq!(plain.as_slice(), b"payload");
    }

    #[test]
    fn each_seal_uses_a_new_nonce() {
        let key = [0x22u8; KEY_LEN];
        let a = seal(&key, b"same", b"").unwrap();
        let b = seal(&key, b"same", b"").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_aad_fails() {
        let key = [0x33u8; KEY_LEN];
        let sealed = seal(&key, b"payload", b"header-a").unwrap();
        let err = open(&key, &sealed.nonce, &sealed.ciphertext, b"header-b").unwrap_err();
        assert_eq!(err, AuthError::VerificationFailed);
    }

    #[test]
    fn short_ciphertext_fails() {
        let key = [0x44u8; KEY_LEN];
        assert!(open(&key, &[0u8; NONCE_LEN], &[0u8; 5], b"").is_err());
    }
}

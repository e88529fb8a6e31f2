//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  Cost parameters and the salt are stored in the
//! envelope header (`KdfParams`) so every unlock derives the exact same
//! key.  Defaults land in the 100ms–1s range on commodity hardware.
//!
//! A wrong passphrase is never detected here: garbage in simply yields a
//! key that fails authentication in the cipher layer.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::errors::{VaultError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Minimum safe memory cost in KiB (8 MB).
pub const MIN_MEMORY_KIB: u32 = 8_192;

/// Largest memory cost a vault may ask for, in KiB (4 GiB).
pub const MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;

/// Largest iteration count a vault may ask for.
pub const MAX_ITERATIONS: u32 = 64;

/// Largest lane count a vault may ask for.
pub const MAX_PARALLELISM: u32 = 255;

/// Shortest salt accepted from a vault header.
pub const MIN_SALT_LEN: usize = 16;

/// Configurable Argon2id cost parameters.
///
/// These map 1:1 to the fields in `Settings` so the CLI can pass
/// whatever the user configured in `.passvault.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// The cheapest parameters the vault accepts. Used by tests.
    pub const fn minimum() -> Self {
        Self {
            memory_kib: MIN_MEMORY_KIB,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Check the parameters against the enforced bounds.
    ///
    /// The upper bounds matter on unlock: the cost comes from the file
    /// and is used before anything has been authenticated.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_MEMORY_KIB..=MAX_MEMORY_KIB).contains(&self.memory_kib) {
            return Err(VaultError::KeyDerivationFailed(format!(
                "Argon2 memory_kib must be between {MIN_MEMORY_KIB} and {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            )));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(VaultError::KeyDerivationFailed(format!(
                "Argon2 iterations must be between 1 and {MAX_ITERATIONS} (got {})",
                self.iterations
            )));
        }
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(VaultError::KeyDerivationFailed(format!(
                "Argon2 parallelism must be between 1 and {MAX_PARALLELISM} (got {})",
                self.parallelism
            )));
        }
        Ok(())
    }
}

/// Identifier of the derivation function recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfAlgorithm {
    Argon2id,
}

/// Everything needed to re-derive the vault key from a passphrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub algorithm: KdfAlgorithm,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,

    /// Random salt, generated once per vault creation (base64 in JSON).
    #[serde(
        serialize_with = "crate::vault::envelope::base64_encode",
        deserialize_with = "crate::vault::envelope::base64_decode"
    )]
    pub salt: Vec<u8>,
}

impl KdfParams {
    /// Fresh parameters with a new random salt.
    pub fn generate(cost: &Argon2Params) -> Self {
        Self {
            algorithm: KdfAlgorithm::Argon2id,
            memory_kib: cost.memory_kib,
            iterations: cost.iterations,
            parallelism: cost.parallelism,
            salt: generate_salt().to_vec(),
        }
    }

    /// Check the cost bounds and the salt length.
    pub fn validate(&self) -> Result<()> {
        self.cost().validate()?;
        if self.salt.len() < MIN_SALT_LEN {
            return Err(VaultError::KeyDerivationFailed(format!(
                "salt must be at least {MIN_SALT_LEN} bytes (got {})",
                self.salt.len()
            )));
        }
        Ok(())
    }

    /// The cost half of the parameters.
    pub fn cost(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

/// Derive a 32-byte key from a passphrase and the stored parameters.
///
/// The same passphrase + params + salt always produce the same key.
/// Only out-of-range cost parameters make this fail.
pub fn derive_key(passphrase: &[u8], params: &KdfParams) -> Result<[u8; KEY_LEN]> {
    params.validate()?;
    match params.algorithm {
        KdfAlgorithm::Argon2id => derive_argon2id(passphrase, &params.salt, &params.cost()),
    }
}

/// Run Argon2id with explicit parameters.
fn derive_argon2id(
    passphrase: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<[u8; KEY_LEN]> {
    argon2_params.validate()?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase, salt, &mut key)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KdfParams {
        KdfParams::generate(&Argon2Params::minimum())
    }

    #[test]
    fn derive_is_deterministic() {
        let params = fast_params();
        let k1 = derive_key(b"Tr0ub4dor&3", &params).unwrap();
        let k2 = derive_key(b"Tr0ub4dor&3", &params).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn garbage_passphrase_still_yields_a_key() {
        let params = fast_params();
        assert!(derive_key(b"", &params).is_ok());
        assert!(derive_key(&[0xFF; 300], &params).is_ok());
    }

    #[test]
    fn rejects_memory_below_minimum() {
        let mut params = fast_params();
        params.memory_kib = 1024;
        let err = derive_key(b"pw", &params).unwrap_err();
        assert!(err.to_string().contains("memory_kib"), "{err}");
    }

    #[test]
    fn rejects_zero_iterations_and_lanes() {
        let mut params = fast_params();
        params.iterations = 0;
        assert!(derive_key(b"pw", &params).is_err());

        let mut params = fast_params();
        params.parallelism = 0;
        assert!(derive_key(b"pw", &params).is_err());
    }

    #[test]
    fn rejects_costs_above_maximum() {
        let mut params = fast_params();
        params.memory_kib = 4_000_000_000;
        let err = derive_key(b"pw", &params).unwrap_err();
        assert!(err.to_string().contains("memory_kib"), "{err}");

        let mut params = fast_params();
        params.iterations = u32::MAX;
        assert!(derive_key(b"pw", &params).is_err());

        let mut params = fast_params();
        params.parallelism = 1024;
        assert!(derive_key(b"pw", &params).is_err());
    }

    #[test]
    fn rejects_short_salt() {
        let mut params = fast_params();
        params.salt.truncate(MIN_SALT_LEN - 1);
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("salt"), "{err}");
    }

    #[test]
    fn generate_uses_fresh_salt() {
        let a = fast_params();
        let b = fast_params();
        assert_eq!(a.salt.len(), SALT_LEN);
        assert_ne!(a.salt, b.salt);
        assert_eq!(a.cost(), Argon2Params::minimum());
    }

    #[test]
    fn params_serialize_with_base64_salt() {
        let params = KdfParams {
            algorithm: KdfAlgorithm::Argon2id,
            memory_kib: 8192,
            iterations: 1,
            parallelism: 1,
            salt: vec![0u8; 3],
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"algorithm\":\"argon2id\""), "{json}");
        assert!(json.contains("\"salt\":\"AAAA\""), "{json}");
        let back: KdfParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}

//! Cryptographic primitives for PassVault.
//!
//! This module provides:
//! - Argon2id password-based key derivation (`kdf`)
//! - Master key handling and HKDF sub-key expansion (`keys`)
//! - AES-256-GCM authenticated encryption (`cipher`)
//! - Keyfile second factor (`keyfile`)
//! - New-passphrase strength policy (`passphrase`)

pub mod cipher;
pub mod kdf;
pub mod keyfile;
pub mod keys;
pub mod passphrase;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, derive_key, ...};
pub use cipher::{open, seal, Sealed, NONCE_LEN, TAG_LEN};
pub use kdf::{derive_key, generate_salt, Argon2Params, KdfAlgorithm, KdfParams};
pub use keyfile::{combine_password_keyfile, generate_keyfile, load_keyfile};
pub use keys::MasterKey;
pub use passphrase::check_strength;

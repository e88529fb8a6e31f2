use std::path::PathBuf;
use thiserror::Error;

/// Failures while parsing the on-disk envelope.
///
/// All of these mean the file itself is unusable until it is restored
/// from a backup; none of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("not a vault file (bad magic bytes)")]
    BadMagic,

    #[error("unsupported vault format version {0}")]
    UnsupportedVersion(u8),

    #[error("vault file is truncated")]
    Truncated,

    #[error("malformed vault header: {0}")]
    MalformedHeader(String),

    #[error("malformed vault payload: {0}")]
    MalformedPayload(String),
}

/// Failure of the authenticated-decryption check.
///
/// There is deliberately a single variant: a wrong passphrase, a wrong
/// keyfile, and a corrupted ciphertext all look the same to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("unlock failed — wrong passphrase or corrupted vault")]
    VerificationFailed,
}

/// All errors that can cross the vault boundary.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Passphrase is too weak: {0}")]
    WeakPassphrase(String),

    // --- Envelope errors ---
    #[error("Invalid vault file: {0}")]
    Decode(#[from] DecodeError),

    // --- Lifecycle errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Vault at {0} is in use by another process")]
    VaultBusy(PathBuf),

    #[error("Vault is locked — unlock it first")]
    VaultLocked,

    #[error("Operation not allowed while the vault is {0}")]
    InvalidState(String),

    // --- Store errors ---
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Account '{username}' already exists for '{label}'")]
    DuplicateAccount { label: String, username: String },

    // --- Keyfile errors ---
    #[error("Keyfile error: {0}")]
    KeyfileError(String),

    // --- Keyring errors ---
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl VaultError {
    /// Returns `true` for errors the user can fix by re-entering input
    /// (bad passphrase, bad field values).
    pub fn is_reprompt(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::Validation(_) | Self::WeakPassphrase(_)
        )
    }
}

/// Convenience type alias for vault results.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_message_does_not_distinguish_causes() {
        let err = VaultError::from(AuthError::VerificationFailed);
        let msg = err.to_string();
        assert!(msg.contains("wrong passphrase or corrupted vault"), "{msg}");
        assert!(err.is_reprompt());
    }

    #[test]
    fn decode_errors_are_distinct() {
        assert_ne!(DecodeError::BadMagic, DecodeError::Truncated);
        assert_ne!(
            DecodeError::UnsupportedVersion(2),
            DecodeError::UnsupportedVersion(3)
        );
        assert!(!VaultError::from(DecodeError::Truncated).is_reprompt());
    }

    #[test]
    fn duplicate_account_names_both_parts() {
        let err = VaultError::DuplicateAccount {
            label: "github.com".into(),
            username: "alice".into(),
        };
        assert_eq!(
            err.to_string(),
            "Account 'alice' already exists for 'github.com'"
        );
    }
}

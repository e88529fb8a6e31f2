//! Vault lifecycle orchestration.
//!
//! `VaultManager` owns everything tied to one vault file: the lifecycle
//! state, the process lock, the derived payload key, and the decrypted
//! `Vault`.  It is the only layer that combines the KDF, the cipher and
//! the envelope codec.
//!
//! ```text
//! Uninitialized --create--> Unlocked
//! Locked --unlock--> Unlocking --ok--> Unlocked --lock--> Locked
//!                              \--err--> Locked
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use zeroize::Zeroizing;

use crate::crypto::{self, check_strength, Argon2Params, KdfParams, MasterKey};
use crate::errors::{Result, VaultError};

use super::envelope::{self, Envelope, EnvelopeHeader};
use super::exchange::{self, ExportFormat};
use super::lock::VaultLock;
use super::model::CredentialUpdate;
use super::store::{Find, MergePolicy, MergeReport, Vault};

/// Where a `VaultManager` is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// No vault file exists yet.
    Uninitialized,
    /// A vault file exists; no key is held.
    Locked,
    /// Key derivation / authentication in progress.
    Unlocking,
    /// Key and decrypted contents are in memory.
    Unlocked,
}

impl std::fmt::Display for VaultState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Locked => "locked",
            Self::Unlocking => "unlocking",
            Self::Unlocked => "unlocked",
        };
        f.write_str(name)
    }
}

/// Everything that only exists while unlocked.
struct Session {
    header: EnvelopeHeader,
    /// HKDF-expanded payload key; zeroed on drop.
    key: MasterKey,
    vault: Vault,
    _lock: VaultLock,
}

/// The handle the interface layer works through.
pub struct VaultManager {
    path: PathBuf,
    cost: Argon2Params,
    keyfile: Option<Zeroizing<Vec<u8>>>,
    state: VaultState,
    session: Option<Session>,
}

impl std::fmt::Debug for VaultManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultManager")
            .field("path", &self.path)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl VaultManager {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// A manager for the vault at `path`; starts `Locked` if the file
    /// exists and `Uninitialized` otherwise.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = if path.exists() {
            VaultState::Locked
        } else {
            VaultState::Uninitialized
        };
        Self {
            path,
            cost: Argon2Params::default(),
            keyfile: None,
            state,
            session: None,
        }
    }

    /// Argon2 cost used by `create` and `change_passphrase`.
    ///
    /// Unlock always uses the parameters stored in the file.
    pub fn with_kdf_params(mut self, cost: Argon2Params) -> Self {
        self.cost = cost;
        self
    }

    /// Combine a keyfile with the passphrase.
    pub fn with_keyfile(mut self, keyfile: Zeroizing<Vec<u8>>) -> Self {
        self.keyfile = Some(keyfile);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> VaultState {
        self.state
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create a new, empty vault and leave it unlocked.
    pub fn create(&mut self, passphrase: &str) -> Result<&Vault> {
        self.create_with(passphrase, Vault::new())
    }

    /// Create a vault from a cleartext legacy/interchange data file.
    pub fn create_from_legacy(&mut self, passphrase: &str, bytes: &[u8]) -> Result<MergeReport> {
        let imported = exchange::parse_import(bytes)?;
        let mut vault = Vault::new();
        let report = vault.merge(imported, MergePolicy::Replace);
        self.create_with(passphrase, vault)?;
        tracing::info!(
            entries = report.entries_added,
            accounts = report.accounts_added,
            "created vault from legacy data"
        );
        Ok(report)
    }

    fn create_with(&mut self, passphrase: &str, vault: Vault) -> Result<&Vault> {
        if self.state != VaultState::Uninitialized || self.path.exists() {
            return Err(VaultError::VaultAlreadyExists(self.path.clone()));
        }
        check_strength(passphrase)?;
        self.cost.validate()?;

        let lock = VaultLock::acquire(&self.path)?;
        let kdf = KdfParams::generate(&self.cost);
        let key = self.derive_payload_key(passphrase, &kdf, self.keyfile.is_some())?;

        let header = EnvelopeHeader {
            kdf,
            created_at: Utc::now(),
            keyfile_required: self.keyfile.is_some(),
        };
        self.session = Some(Session {
            header,
            key,
            vault,
            _lock: lock,
        });

        if let Err(e) = self.save() {
            self.session = None;
            return Err(e);
        }
        self.state = VaultState::Unlocked;
        tracing::info!(path = %self.path.display(), "created vault");
        self.vault()
    }

    /// Derive the key from `passphrase` and decrypt the vault.
    ///
    /// A wrong passphrase, a wrong keyfile and a corrupted file all give
    /// the same `AuthError`, and the manager stays `Locked`.
    pub fn unlock(&mut self, passphrase: &str) -> Result<&Vault> {
        match self.state {
            VaultState::Locked => {}
            VaultState::Uninitialized => {
                return Err(VaultError::VaultNotFound(self.path.clone()));
            }
            other => return Err(VaultError::InvalidState(other.to_string())),
        }

        self.state = VaultState::Unlocking;
        match self.open_session(passphrase) {
            Ok(session) => {
                self.session = Some(session);
                self.state = VaultState::Unlocked;
                tracing::info!(path = %self.path.display(), "vault unlocked");
                self.vault()
            }
            Err(e) => {
                self.state = VaultState::Locked;
                tracing::warn!(path = %self.path.display(), "vault unlock failed");
                Err(e)
            }
        }
    }

    fn open_session(&self, passphrase: &str) -> Result<Session> {
        let lock = VaultLock::acquire(&self.path)?;
        let envelope = envelope::read_envelope(&self.path)?;
        let header = envelope.header().clone();

        if header.keyfile_required && self.keyfile.is_none() {
            return Err(VaultError::KeyfileError(
                "this vault requires a keyfile (use --keyfile <path>)".into(),
            ));
        }

        let key = self.derive_payload_key(passphrase, &header.kdf, header.keyfile_required)?;
        let plaintext = crypto::open(
            key.as_bytes(),
            envelope.nonce(),
            envelope.ciphertext(),
            &envelope.associated_data(),
        )?;
        let vault = Vault::from_payload(&plaintext)?;

        Ok(Session {
            header,
            key,
            vault,
            _lock: lock,
        })
    }

    fn derive_payload_key(
        &self,
        passphrase: &str,
        kdf: &KdfParams,
        use_keyfile: bool,
    ) -> Result<MasterKey> {
        let keyfile = if use_keyfile {
            self.keyfile.as_deref().map(Vec::as_slice)
        } else {
            None
        };
        MasterKey::derive(passphrase.as_bytes(), keyfile, kdf)?.vault_key()
    }

    /// Seal the current contents under a fresh nonce and replace the
    /// file atomically.
    pub fn save(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(VaultError::VaultLocked)?;

        let aad = envelope::associated_data_for(&session.header)?;
        let payload = session.vault.to_payload()?;
        let sealed = crypto::seal(session.key.as_bytes(), &payload, &aad)?;
        let envelope = Envelope::new(session.header.clone(), sealed.nonce, sealed.ciphertext)?;
        envelope::write_envelope(&self.path, &envelope)?;

        session.vault.mark_clean();
        tracing::debug!(
            entries = session.vault.len(),
            accounts = session.vault.account_count(),
            "vault saved"
        );
        Ok(())
    }

    /// Drop the key and decrypted contents. Unsaved changes are lost.
    pub fn lock(&mut self) {
        if let Some(session) = self.session.take() {
            if session.vault.is_dirty() {
                tracing::warn!("locking vault with unsaved changes");
            }
        }
        self.state = if self.path.exists() {
            VaultState::Locked
        } else {
            VaultState::Uninitialized
        };
        tracing::info!(path = %self.path.display(), "vault locked");
    }

    /// Re-salt and re-key under a new passphrase, then save.
    pub fn change_passphrase(&mut self, new_passphrase: &str) -> Result<()> {
        check_strength(new_passphrase)?;
        self.cost.validate()?;
        if self.session.is_none() {
            return Err(VaultError::VaultLocked);
        }

        let kdf = KdfParams::generate(&self.cost);
        let use_keyfile = self.keyfile.is_some();
        let key = self.derive_payload_key(new_passphrase, &kdf, use_keyfile)?;

        let session = self.session.as_mut().ok_or(VaultError::VaultLocked)?;
        let previous_header = session.header.clone();
        let previous_key = std::mem::replace(&mut session.key, key);
        session.header.kdf = kdf;
        session.header.keyfile_required = use_keyfile;

        if let Err(e) = self.save() {
            // Nothing was written; keep the old key so the session still
            // matches the file on disk.
            if let Some(session) = self.session.as_mut() {
                session.header = previous_header;
                session.key = previous_key;
            }
            return Err(e);
        }
        tracing::info!("vault passphrase changed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Contents
    // ------------------------------------------------------------------

    /// Read access to the decrypted store.
    pub fn vault(&self) -> Result<&Vault> {
        self.session
            .as_ref()
            .map(|s| &s.vault)
            .ok_or(VaultError::VaultLocked)
    }

    fn vault_mut(&mut self) -> Result<&mut Vault> {
        self.session
            .as_mut()
            .map(|s| &mut s.vault)
            .ok_or(VaultError::VaultLocked)
    }

    /// `true` when there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.vault.is_dirty())
    }

    pub fn add_credential(
        &mut self,
        label: &str,
        username: &str,
        secret: &str,
        description: &str,
    ) -> Result<()> {
        self.vault_mut()?
            .add_credential(label, username, secret, description)
    }

    pub fn edit_credential(
        &mut self,
        label: &str,
        username: &str,
        update: CredentialUpdate,
    ) -> Result<()> {
        self.vault_mut()?.edit_credential(label, username, update)
    }

    pub fn remove_credential(&mut self, label: &str, username: &str) -> Result<()> {
        self.vault_mut()?.remove_credential(label, username)
    }

    pub fn remove_entry(&mut self, label: &str) -> Result<()> {
        self.vault_mut()?.remove_entry(label)
    }

    pub fn find<'a>(&'a self, query: &str) -> Result<Find<'a>> {
        Ok(self.vault()?.find(query))
    }

    /// Render the decrypted vault as cleartext.
    pub fn export(&self, format: ExportFormat) -> Result<Zeroizing<Vec<u8>>> {
        let vault = self.vault()?;
        let bytes = exchange::export(vault, format)?;
        tracing::info!(
            entries = vault.len(),
            accounts = vault.account_count(),
            ?format,
            "exported vault"
        );
        Ok(bytes)
    }

    /// Parse and merge an interchange document. The whole document is
    /// validated before anything touches the store.
    pub fn import(&mut self, bytes: &[u8], policy: MergePolicy) -> Result<MergeReport> {
        self.vault()?;
        let incoming = exchange::parse_import(bytes)?;
        let report = self.vault_mut()?.merge(incoming, policy);
        tracing::info!(
            entries_added = report.entries_added,
            entries_merged = report.entries_merged,
            accounts_added = report.accounts_added,
            accounts_updated = report.accounts_updated,
            ?policy,
            "imported records"
        );
        Ok(report)
    }
}

//! Binary envelope format for the encrypted vault file.
//!
//! A `.vault` file has this layout:
//!
//! ```text
//! [PVLT: 4 bytes][version: 1 byte][header_len: 4 bytes LE][header JSON][nonce: 12 bytes][ciphertext + tag]
//! ```
//!
//! - **Magic** (`PVLT`): identifies the file as a PassVault vault.
//! - **Version**: envelope format version (currently `1`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the nonce begins.
//! - **Header JSON**: serialized `EnvelopeHeader` (KDF params + salt).
//! - **Nonce**: fresh per save, never reused with the same key.
//! - **Ciphertext + tag**: AES-256-GCM output over the serialized vault.
//!
//! Everything before the nonce is the AEAD associated data, so the header
//! is authenticated along with the payload.  The header bytes are kept
//! exactly as read so authentication never depends on re-serialization.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::kdf::KdfParams;
use crate::crypto::{NONCE_LEN, TAG_LEN};
use crate::errors::{DecodeError, VaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"PVLT";

/// Current binary format version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 4 (header_len).
const PREFIX_LEN: usize = 9;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Cleartext metadata needed to re-derive the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    /// Algorithm, cost parameters and salt.
    pub kdf: KdfParams,

    /// When this vault was first created.
    pub created_at: DateTime<Utc>,

    /// Whether a keyfile must be combined with the passphrase.
    #[serde(default)]
    pub keyfile_required: bool,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The parsed contents of a vault file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    format_version: u8,
    header: EnvelopeHeader,
    /// Header JSON exactly as written/read.
    header_bytes: Vec<u8>,
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Build an envelope at the current format version.
    pub fn new(header: EnvelopeHeader, nonce: [u8; NONCE_LEN], ciphertext: Vec<u8>) -> Result<Self> {
        let header_bytes = serialize_header(&header)?;
        Ok(Self {
            format_version: CURRENT_VERSION,
            header,
            header_bytes,
            nonce,
            ciphertext,
        })
    }

    pub fn format_version(&self) -> u8 {
        self.format_version
    }

    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Ciphertext with the GCM tag appended.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Bytes authenticated alongside the payload: prefix + header JSON.
    pub fn associated_data(&self) -> Vec<u8> {
        let mut aad = Vec::with_capacity(PREFIX_LEN + self.header_bytes.len());
        write_prefix(&mut aad, self.format_version, &self.header_bytes);
        aad
    }
}

/// Serialize the header alone, as it will appear on disk.
fn serialize_header(header: &EnvelopeHeader) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(header)
        .map_err(|e| VaultError::SerializationError(format!("header: {e}")))?;
    if u32::try_from(bytes.len()).is_err() {
        return Err(VaultError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Compute the associated data a header will have once encoded.
///
/// Used before sealing, when the nonce and ciphertext do not exist yet.
pub fn associated_data_for(header: &EnvelopeHeader) -> Result<Vec<u8>> {
    let header_bytes = serialize_header(header)?;
    let mut aad = Vec::with_capacity(PREFIX_LEN + header_bytes.len());
    write_prefix(&mut aad, CURRENT_VERSION, &header_bytes);
    Ok(aad)
}

fn write_prefix(buf: &mut Vec<u8>, version: u8, header_bytes: &[u8]) {
    // Length was checked against u32::MAX when the bytes were produced.
    let header_len = header_bytes.len() as u32;
    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(version); // 1 byte
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(header_bytes); // header JSON
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Serialize an envelope to its on-disk bytes.
pub fn encode(envelope: &Envelope) -> Vec<u8> {
    let total =
        PREFIX_LEN + envelope.header_bytes.len() + NONCE_LEN + envelope.ciphertext.len();
    let mut buf = Vec::with_capacity(total);

    write_prefix(&mut buf, envelope.format_version, &envelope.header_bytes);
    buf.extend_from_slice(&envelope.nonce); // 12 bytes
    buf.extend_from_slice(&envelope.ciphertext); // ciphertext + tag

    buf
}

/// Parse on-disk bytes into an envelope.
///
/// Never guesses: anything that is not exactly a well-formed envelope
/// is reported as one of the `DecodeError` variants.
pub fn decode(data: &[u8]) -> std::result::Result<Envelope, DecodeError> {
    if data.len() < MAGIC.len() {
        return Err(DecodeError::Truncated);
    }
    if &data[0..4] != MAGIC {
        return Err(DecodeError::BadMagic);
    }

    let version = *data.get(4).ok_or(DecodeError::Truncated)?;
    if version != CURRENT_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let len_bytes: [u8; 4] = data
        .get(5..PREFIX_LEN)
        .ok_or(DecodeError::Truncated)?
        .try_into()
        .map_err(|_| DecodeError::Truncated)?;
    let header_len =
        usize::try_from(u32::from_le_bytes(len_bytes)).map_err(|_| DecodeError::Truncated)?;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .ok_or(DecodeError::Truncated)?;
    let nonce_end = header_end
        .checked_add(NONCE_LEN)
        .ok_or(DecodeError::Truncated)?;
    if nonce_end + TAG_LEN > data.len() {
        return Err(DecodeError::Truncated);
    }

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let header: EnvelopeHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| DecodeError::MalformedHeader(e.to_string()))?;
    // The KDF runs before authentication, so its inputs are bounded here.
    header
        .kdf
        .validate()
        .map_err(|e| DecodeError::MalformedHeader(e.to_string()))?;

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&data[header_end..nonce_end]);
    let ciphertext = data[nonce_end..].to_vec();

    Ok(Envelope {
        format_version: version,
        header,
        header_bytes,
        nonce,
        ciphertext,
    })
}

// ---------------------------------------------------------------------------
// Disk I/O
// ---------------------------------------------------------------------------

/// Path of the temporary file used during an atomic write.
pub fn temp_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}

/// Write an envelope to disk **atomically**.
///
/// 1. Write the bytes to a temp file in the same directory and fsync it.
/// 2. Rename the temp file over the target path.
/// 3. Fsync the directory so the rename itself is durable (Unix).
///
/// A crash at any point leaves either the old file or the new one at
/// `path`, never a partial write.
pub fn write_envelope(path: &Path, envelope: &Envelope) -> Result<()> {
    let bytes = encode(envelope);
    let tmp_path = temp_path(path);

    let staged = create_private(&tmp_path).and_then(|mut file| {
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, path)?;
        Ok(())
    });
    if let Err(e) = staged {
        let _ = fs::remove_file(&tmp_path);
        tracing::warn!(path = %path.display(), "vault write failed; temp file removed");
        return Err(e);
    }

    #[cfg(unix)]
    if let Some(parent) = path.parent() {
        let dir = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(handle) = fs::File::open(dir) {
            let _ = handle.sync_all();
        }
    }

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote vault envelope");
    Ok(())
}

/// Create (truncating) a file readable only by the owner on Unix.
fn create_private(path: &Path) -> Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    Ok(options.open(path)?)
}

/// Read and decode the envelope at `path`.
pub fn read_envelope(path: &Path) -> Result<Envelope> {
    if !path.exists() {
        return Err(VaultError::VaultNotFound(path.to_path_buf()));
    }
    let data = fs::read(path)?;
    Ok(decode(&data)?)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

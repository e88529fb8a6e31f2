//! Vault module — encrypted credential storage.
//!
//! This module provides:
//! - `Credential` and `WebsiteEntry` types (`model`)
//! - The in-memory `Vault` store with merge and search (`store`)
//! - Legacy/current record shapes and migration (`records`)
//! - Cleartext JSON/text interchange (`exchange`)
//! - Binary envelope format with atomic writes (`envelope`)
//! - Cross-process advisory lock (`lock`)
//! - `VaultManager`, the lifecycle orchestrator (`manager`)

pub mod envelope;
pub mod exchange;
pub mod lock;
pub mod manager;
pub mod model;
pub mod records;
pub mod store;

// Re-export the most commonly used items.
pub use envelope::{Envelope, EnvelopeHeader};
pub use exchange::ExportFormat;
pub use manager::{VaultManager, VaultState};
pub use model::{normalize_label, Credential, CredentialUpdate, WebsiteEntry};
pub use store::{EntryMatch, Find, MergePolicy, MergeReport, Vault};

//! Advisory cross-process lock on a vault file.
//!
//! The lock lives in a sibling `<vault>.lock` file. On Unix it is an
//! exclusive non-blocking `flock`, released by the kernel when the file
//! handle closes (including when the process dies). Elsewhere the lock
//! file itself is the sentinel: it is created with `create_new` and
//! removed on drop.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::errors::{Result, VaultError};

/// Held for as long as a process has a vault open.
#[derive(Debug)]
pub struct VaultLock {
    path: PathBuf,
    _file: File,
}

/// Path of the lock file guarding `vault_path`.
pub fn lock_path(vault_path: &Path) -> PathBuf {
    let mut name = vault_path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    vault_path.with_file_name(name)
}

impl VaultLock {
    /// Take the lock or fail with `VaultBusy` if another process holds it.
    pub fn acquire(vault_path: &Path) -> Result<Self> {
        let path = lock_path(vault_path);
        let file = open_locked(&path, vault_path)?;
        tracing::debug!(path = %path.display(), "acquired vault lock");
        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
fn open_locked(path: &Path, vault_path: &Path) -> Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    use std::os::unix::io::AsRawFd;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .mode(0o600)
        .open(path)?;

    // SAFETY: the descriptor is valid for as long as `file` is alive.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::WouldBlock {
            return Err(VaultError::VaultBusy(vault_path.to_path_buf()));
        }
        return Err(err.into());
    }
    Ok(file)
}

#[cfg(not(unix))]
fn open_locked(path: &Path, vault_path: &Path) -> Result<File> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(VaultError::VaultBusy(vault_path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        // On Unix the flock goes away with the descriptor; the file stays
        // so a concurrent opener never races a delete.
        #[cfg(not(unix))]
        let _ = std::fs::remove_file(&self.path);
        tracing::debug!(path = %self.path.display(), "released vault lock");
    }
}

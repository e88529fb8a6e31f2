//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::check_strength;
use crate::errors::{Result, VaultError};
use crate::vault::VaultManager;

/// Environment variable holding the vault passphrase (CI/scripts).
pub const PASSWORD_ENV: &str = "PASSVAULT_PASSWORD";

/// Environment variable holding the new passphrase for `rotate-key`.
pub const NEW_PASSWORD_ENV: &str = "PASSVAULT_NEW_PASSWORD";

/// PassVault CLI: local encrypted credential vault.
#[derive(Parser)]
#[command(
    name = "passvault",
    about = "Local encrypted credential vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (default: from .passvault.toml, else passwords.vault)
    #[arg(long, global = true, env = "PASSVAULT_VAULT")]
    pub vault: Option<String>,

    /// Path to a keyfile for two-factor vault access
    #[arg(long, global = true, env = "PASSVAULT_KEYFILE")]
    pub keyfile: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault (offers to migrate an existing passwords.json)
    Init,

    /// Add a credential to a website entry
    Add {
        /// Website or application label
        label: String,
        /// Account username
        username: String,
        /// Password (omit for interactive prompt or piped stdin)
        secret: Option<String>,
        /// Optional note
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Change a credential's username, password, or description
    Edit {
        label: String,
        username: String,
        /// New username
        #[arg(long)]
        rename: Option<String>,
        /// Prompt for (or read from stdin) a new password
        #[arg(long)]
        password: bool,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Print a credential's password
    Get {
        label: String,
        /// Account username (default: the entry's primary account)
        username: Option<String>,
    },

    /// List entries, optionally filtered by a label/username substring
    List {
        query: Option<String>,
    },

    /// Remove a credential, or a whole entry when no username is given
    Rm {
        label: String,
        username: Option<String>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Export all credentials as cleartext
    Export {
        /// Output format: json or text (default: from file extension, else json)
        #[arg(short, long)]
        format: Option<String>,

        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import credentials from a JSON export or legacy data file
    Import {
        file: String,

        /// Replace the vault contents instead of merging
        #[arg(long)]
        replace: bool,
    },

    /// Create a vault from a cleartext legacy data file
    Migrate {
        /// Legacy file (default: from .passvault.toml, else passwords.json)
        file: Option<String>,
    },

    /// Change the vault's master passphrase
    RotateKey,

    /// Manage authentication methods (keyring, keyfile)
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Only entries newer than an age (7d, 24h, 30m, 2w) or a date (2026-10-01)
        #[arg(long)]
        since: Option<String>,
        /// Only entries for one operation (e.g. import, rm, rotate-key)
        #[arg(long)]
        op: Option<String>,
        /// Include entries for every vault in the directory
        #[arg(long)]
        all: bool,
    },

    /// Print a shell completion script to stdout
    Completions {
        shell: Shell,
    },
}

/// Auth subcommands for keyring and keyfile management.
#[derive(clap::Subcommand)]
pub enum AuthAction {
    /// Save the vault passphrase to the OS keyring
    Keyring {
        /// Remove the passphrase from the keyring instead of saving
        #[arg(long)]
        delete: bool,
    },

    /// Generate a new random keyfile
    KeyfileGenerate {
        /// Path for the keyfile (default: next to the vault)
        path: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load `.passvault.toml` from the working directory.
pub fn settings() -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    Settings::load(&cwd)
}

/// Resolve the vault file: `--vault` wins, then the config file.
pub fn vault_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(match &cli.vault {
        Some(path) => cwd.join(path),
        None => settings.vault_path(&cwd),
    })
}

/// Load the keyfile bytes from `--keyfile`, if given.
pub fn load_keyfile(cli: &Cli) -> Result<Option<Zeroizing<Vec<u8>>>> {
    cli.keyfile
        .as_deref()
        .map(|path| crate::crypto::load_keyfile(Path::new(path)))
        .transpose()
}

/// A manager for the configured vault, with cost and keyfile applied.
pub fn manager(cli: &Cli) -> Result<VaultManager> {
    let settings = settings()?;
    let path = vault_path(cli, &settings)?;
    let mut manager = VaultManager::new(path).with_kdf_params(settings.argon2_params());
    if let Some(keyfile) = load_keyfile(cli)? {
        manager = manager.with_keyfile(keyfile);
    }
    Ok(manager)
}

/// A manager for the configured vault, already unlocked.
pub fn open_manager(cli: &Cli) -> Result<VaultManager> {
    let mut manager = manager(cli)?;
    let vault_id = manager.path().to_string_lossy().into_owned();
    let password = prompt_password_for_vault(Some(&vault_id))?;
    manager.unlock(&password)?;
    Ok(manager)
}

/// Get the vault passphrase, trying in order:
/// 1. `PASSVAULT_PASSWORD` env var
/// 2. OS keyring (if compiled with `keyring-store`)
/// 3. Interactive prompt
pub fn prompt_password_for_vault(vault_id: Option<&str>) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    #[cfg(feature = "keyring-store")]
    if let Some(id) = vault_id {
        match crate::keyring::get_passphrase(id) {
            Ok(Some(pw)) => return Ok(Zeroizing::new(pw)),
            Ok(None) => {}
            Err(e) => tracing::debug!(error = %e, "keyring unavailable"),
        }
    }

    #[cfg(not(feature = "keyring-store"))]
    let _ = vault_id;

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault passphrase")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation, re-prompting until it
/// passes the strength policy. `env_var` short-circuits the prompt.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            let pw = Zeroizing::new(pw);
            check_strength(&pw)?;
            return Ok(pw);
        }
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose vault passphrase")
                .with_confirmation(
                    "Confirm vault passphrase",
                    "Passphrases do not match, try again",
                )
                .interact()
                .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?,
        );

        match check_strength(&password) {
            Ok(()) => return Ok(password),
            Err(e) => output::warning(&format!("{e}. Try again.")),
        }
    }
}

/// Read a credential password from, in order: the inline argument,
/// piped stdin, or a hidden prompt.
pub fn read_secret(prompt: &str, inline: Option<&str>) -> Result<Zeroizing<String>> {
    if let Some(v) = inline {
        output::warning("Password provided on command line — it may appear in shell history.");
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        return Ok(Zeroizing::new(buf.trim_end().to_string()));
    }

    let value = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(value))
}

/// Ask a yes/no question; non-interactive sessions get `default`.
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(default);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("failed to read confirmation: {e}")))
}

/// Write the completion script for `shell`, e.g.
/// `passvault completions bash > ~/.bash_completion.d/passvault`.
pub fn write_completions(shell: Shell, out: &mut dyn Write) {
    clap_complete::generate(shell, &mut Cli::command(), "passvault", out);
}

/// Record an operation in the audit log when that feature is built in.
pub fn audit(vault_path: &Path, op: &str, details: Option<&str>) {
    #[cfg(feature = "audit-log")]
    crate::audit::log_audit(vault_path, op, details);

    #[cfg(not(feature = "audit-log"))]
    let _ = (vault_path, op, details);
}

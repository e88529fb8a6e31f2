//! Minimum-strength check for new master passphrases.
//!
//! This is a basic character-pool entropy estimate, not a password
//! generator or a dictionary check.

use std::collections::HashSet;

use crate::errors::{VaultError, Result};

/// Minimum passphrase length in characters.
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// Minimum number of distinct characters.
const MIN_DISTINCT_CHARS: usize = 5;

/// Minimum estimated entropy in bits.
const MIN_ENTROPY_BITS: f64 = 40.0;

/// Estimate entropy as `length * log2(pool size)`.
///
/// The pool is the sum of the character classes that appear: lowercase
/// (26), uppercase (26), digits (10), ASCII symbols (33), and anything
/// non-ASCII (counted as a further 100).
pub fn estimate_entropy_bits(passphrase: &str) -> f64 {
    let (mut lower, mut upper, mut digit, mut symbol, mut other) =
        (false, false, false, false, false);

    for c in passphrase.chars() {
        if c.is_ascii_lowercase() {
            lower = true;
        } else if c.is_ascii_uppercase() {
            upper = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else if c.is_ascii() {
            symbol = true;
        } else {
            other = true;
        }
    }

    let pool = [(lower, 26), (upper, 26), (digit, 10), (symbol, 33), (other, 100)]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, size)| size)
        .sum::<u32>();

    if pool == 0 {
        return 0.0;
    }

    passphrase.chars().count() as f64 * f64::from(pool).log2()
}

/// Reject passphrases that are too short or too predictable.
pub fn check_strength(passphrase: &str) -> Result<()> {
    let len = passphrase.chars().count();
    if len < MIN_PASSPHRASE_LEN {
        return Err(VaultError::WeakPassphrase(format!(
            "must be at least {MIN_PASSPHRASE_LEN} characters"
        )));
    }

    let distinct: HashSet<char> = passphrase.chars().collect();
    if distinct.len() < MIN_DISTINCT_CHARS {
        return Err(VaultError::WeakPassphrase(format!(
            "must contain at least {MIN_DISTINCT_CHARS} different characters"
        )));
    }

    let bits = estimate_entropy_bits(passphrase);
    if bits < MIN_ENTROPY_BITS {
        return Err(VaultError::WeakPassphrase(format!(
            "estimated strength {bits:.0} bits is below {MIN_ENTROPY_BITS:.0} — mix character classes or make it longer"
        )));
    }

    Ok(())
}

//! Account key normalization
//!
//! Both sides of the reconciliation join on a string account identifier.
//! Upstream tooling frequently round-trips numeric-looking identifiers
//! through floating point, leaving a spurious ".0" suffix; normalization
//! strips that artifact so "5001234567.0" and "5001234567" join.

use crate::error::{Error, Result};
use crate::models::AccountKey;

/// Normalize a raw cell value into a canonical [`AccountKey`].
///
/// Trims surrounding whitespace and removes one trailing ".0" float artifact
/// from otherwise-numeric identifiers. Idempotent:
/// `normalize(normalize(x)) == normalize(x)`.
///
/// Returns [`Error::InvalidKey`] when the value is empty after trimming.
/// Callers exclude such rows rather than defaulting to a sentinel key.
pub fn normalize(raw: &str) -> Result<AccountKey> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidKey);
    }

    let cleaned = strip_float_artifact(trimmed);
    Ok(AccountKey(cleaned.to_string()))
}

/// Strip a trailing ".0" left behind by float parsing, but only when the
/// remainder is purely numeric. "A1.0" is a real identifier, not an artifact.
fn strip_float_artifact(s: &str) -> &str {
    if let Some(stem) = s.strip_suffix(".0") {
        if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()) {
            return stem;
        }
    }
    s
}

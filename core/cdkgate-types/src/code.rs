//! CDK code syntax: a fixed-length token over an uppercase-alphanumeric
//! alphabet.
//!
//! Entry is case-insensitive (`abc1...` and `ABC1...` name the same code)
//! but storage is canonical uppercase, so normalization happens exactly once
//! at the boundary, in [`CdkCode::normalize`].

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The alphabet codes are drawn from: uppercase letters and digits.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fixed code length in characters.
pub const CODE_LEN: usize = 16;

/// A syntactically valid activation code.
///
/// Guaranteed to be exactly [`CODE_LEN`] characters over [`CODE_ALPHABET`].
/// Construct via [`CdkCode::normalize`] for client input or
/// [`CdkCode::from_canonical`] for strings already in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CdkCode(String);

impl CdkCode {
    /// Normalizes client input into a canonical code: trims surrounding
    /// whitespace, uppercases, then validates length and alphabet.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCode` if the input is empty, has the wrong
    /// length, or contains characters outside `[A-Z0-9]`.
    pub fn normalize(input: &str) -> crate::Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidCode("code is empty".to_string()));
        }
        Self::from_canonical(&trimmed.to_ascii_uppercase())
    }

    /// Validates a string already expected to be in canonical form
    /// (uppercase, no surrounding whitespace).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCode` on length or alphabet violations.
    pub fn from_canonical(s: &str) -> crate::Result<Self> {
        if s.len() != CODE_LEN {
            return Err(Error::InvalidCode(format!(
                "code must be {CODE_LEN} characters, got {}",
                s.len()
            )));
        }
        if !s.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
            return Err(Error::InvalidCode(
                "code contains characters outside [A-Z0-9]".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CdkCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CdkCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

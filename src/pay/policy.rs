use rand::Rng as _;
use serde::Deserialize;

use crate::Result;
use crate::error::Error;

pub const DEFAULT_NONCE_LENGTH: usize = 32;
pub const DEFAULT_NONCE_ALPHABET: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// How `nonce_str` values are generated.
///
/// The alphabet must be non-empty printable ASCII. The provider caps
/// `nonce_str` at 32 characters.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct NoncePolicy {
    pub length: usize,
    pub alphabet: String,
}

impl Default for NoncePolicy {
    fn default() -> Self {
        Self {
            length: DEFAULT_NONCE_LENGTH,
            alphabet: DEFAULT_NONCE_ALPHABET.to_owned(),
        }
    }
}

impl NoncePolicy {
    /// Builds a validated policy.
    ///
    /// `length` is caller-chosen but bounded by the provider, which rejects a
    /// `nonce_str` longer than [`DEFAULT_NONCE_LENGTH`] characters. A length
    /// outside `1..=32`, an empty alphabet or one holding anything but
    /// printable ASCII is an [`crate::error::Kind::Validation`] error.
    pub fn new<S: Into<String>>(length: usize, alphabet: S) -> Result<Self> {
        let policy = Self {
            length,
            alphabet: alphabet.into(),
        };
        policy.validate()?;
        Ok(policy)
    }

    #[must_use]
    pub fn with_length(length: usize) -> Self {
        Self {
            length,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.length == 0 || self.length > DEFAULT_NONCE_LENGTH {
            return Err(Error::validation(format!(
                "nonce length must be within 1..={DEFAULT_NONCE_LENGTH}, got {}",
                self.length
            )));
        }
        if self.alphabet.is_empty() {
            return Err(Error::validation("nonce alphabet must not be empty"));
        }
        if !self.alphabet.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(Error::validation(
                "nonce alphabet must contain printable ASCII only",
            ));
        }
        Ok(())
    }

    /// Draws a fresh random string according to this policy.
    pub fn generate(&self) -> Result<String> {
        self.validate()?;

        let symbols = self.alphabet.as_bytes();
        let mut rng = rand::rng();
        Ok((0..self.length)
            .map(|_| char::from(symbols[rng.random_range(0..symbols.len())]))
            .collect())
    }
}

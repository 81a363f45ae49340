//! Redacted storage for HuggingFace access tokens.

use serde::Deserialize;
use std::fmt;

/// A string whose `Debug` and `Display` output never shows its content.
///
/// Used for the Hub token so that logging a config or an error cannot leak it.
///
/// ```
/// use instructkit_core::SecretString;
///
/// let token = SecretString::new("hf_abc123");
/// assert_eq!(format!("{:?}", token), "SecretString([REDACTED])");
/// assert_eq!(token.expose_secret(), "hf_abc123");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretString {
    inner: String,
}

impl SecretString {
    /// Wrap a secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            inner: secret.into(),
        }
    }

    /// Wrap an optional value, treating empty strings as absent.
    pub fn from_option(secret: Option<impl Into<String>>) -> Option<Self> {
        secret.map(Self::new).filter(|s| !s.is_empty())
    }

    /// Read the secret. Do not log the result.
    #[inline]
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// Whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

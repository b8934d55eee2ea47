//! Redacting wrapper for provider credentials.
//!
//! [`SecretString`] keeps API keys out of logs, `Debug` output, and any
//! JSON the client writes back out (config dumps, persisted state).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A credential that never shows up in logs, `Debug` output, or serialized JSON.
///
/// - `Debug` / `Display` print `[REDACTED]` (or nothing when empty)
/// - `Serialize` emits an empty string
/// - `Deserialize` accepts a plain string, so config files stay simple
/// - [`expose()`](SecretString::expose) hands out the raw value for the
///   `Authorization` header
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a credential value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential. Only the transport layer should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no credential is set.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "\"\"")
        } else {
            write!(f, "\"[REDACTED]\"")
        }
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, "[REDACTED]")
        }
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(SecretString(s))
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        SecretString(s.to_owned())
    }
}

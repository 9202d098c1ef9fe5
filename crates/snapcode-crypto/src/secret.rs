//! API key wrapper
//!
//! The raw string only leaves the wrapper through `expose()`, so a stray
//! `{:?}` in a log line prints `ApiKey([REDACTED])` instead of the key.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::new(value.into()))
    }

    /// Parse user input. Surrounding whitespace is dropped; blank input yields `None`.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self::new(trimmed))
        }
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.expose().len()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }

    /// Compare two keys without exposing either to the caller.
    pub fn matches(&self, other: &ApiKey) -> bool {
        self.expose() == other.expose()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_string())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let key = ApiKey::new("AIzaSy-super-secret");
        let printed = format!("{:?}", key);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn test_parse_trims_and_rejects_blank() {
        assert!(ApiKey::parse("   \n").is_none());
        let key = ApiKey::parse("  abc123 \n").unwrap();
        assert_eq!(key.expose(), "abc123");
        assert_eq!(key.len(), 6);
    }

    #[test]
    fn test_matches() {
        let a = ApiKey::new("same");
        assert!(a.matches(&a.clone()));
        assert!(!a.matches(&ApiKey::new("other")));
    }
}

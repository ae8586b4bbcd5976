//! Secret string wrapper that never appears in logs.

use serde::Deserialize;

/// Wrapper for secrets that never appears in logs.
///
/// Connection URLs usually embed a password, so the configured URL is kept
/// in this type. The `Debug` and `Display` implementations always show
/// `[REDACTED]` instead of the actual value.
///
/// # Example
///
/// ```
/// use mailsender::config::SecretString;
///
/// let secret = SecretString::new("postgres://mail:pw@db/app".to_string());
/// assert_eq!(format!("{:?}", secret), "[REDACTED]");
/// assert_eq!(secret.expose(), "postgres://mail:pw@db/app");
/// ```
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new `SecretString` from a regular `String`.
    pub fn new(s: String) -> Self {
        SecretString(s)
    }

    /// Exposes the underlying secret value.
    ///
    /// Never pass the result to logging functions.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(SecretString::new(s))
    }
}

//! Secure credential handling using the secrecy crate
//!
//! Passwords typed for key generation and tokens for the remote key service
//! are held in [`SecretString`]: memory is zeroed on drop and `Debug` output
//! is redacted.
//!
//! # Example
//!
//! ```rust
//! use conftree::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let token = secret_string("my-token".to_string());
//! assert_eq!(token.expose_secret().as_ref(), "my-token");
//! assert!(!format!("{token:?}").contains("my-token"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret};
use serde::{Deserialize, Deserializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Newtype wrapper for String that implements the required traits for Secret
#[derive(Clone, Debug, Zeroize, ZeroizeOnDrop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Check if the secret value is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bytes of the secret, for key derivation
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Secret string: zeroed on drop, redacted in `Debug`, read via `expose_secret()`
pub type SecretString = Secret<SecretValue>;

/// Helper function to create a SecretString from a String
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

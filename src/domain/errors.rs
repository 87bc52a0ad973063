//! Domain error types
//!
//! This module defines the error hierarchy for conftree. All errors are
//! domain-specific and don't expose third-party types.

use std::path::PathBuf;
use thiserror::Error;

/// Main conftree error type
///
/// Every fallible operation of the loader, the tree and the resolver
/// returns this type.
#[derive(Debug, Error)]
pub enum ConfError {
    /// No configuration source could be resolved and empty init is disabled
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    /// A dotted path does not exist in the tree
    #[error("Variable {path} not exist in the config file (missing `{missing}`)")]
    AttrNotFound {
        /// Full dotted path that was requested
        path: String,
        /// First hop that could not be resolved
        missing: String,
    },

    /// Root-level structural validation failed
    #[error("Invalid configuration structure: {0}")]
    ConfigStructureInvalid(String),

    /// The source could not be parsed
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Source that failed to parse
        path: PathBuf,
        /// Parser diagnostic
        message: String,
    },

    /// Crypt adapter errors outside of tree construction
    #[error("Crypt error: {0}")]
    Crypt(#[from] CryptError),

    /// An encrypted field could not be resolved
    #[error("Failed to decrypt field `{field}`: {source}")]
    Decrypt {
        /// Dotted path of the encrypted field, prefix included
        field: String,
        /// Underlying crypt failure
        #[source]
        source: CryptError,
    },

    /// Invalid settings for the engine itself
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl ConfError {
    /// Returns the crypt failure carried by this error, if any
    ///
    /// Covers both adapter calls made directly and failures raised while
    /// resolving an `enc_` field.
    pub fn crypt_error(&self) -> Option<&CryptError> {
        match self {
            ConfError::Crypt(e) => Some(e),
            ConfError::Decrypt { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Crypt adapter errors
///
/// Kinds are kept separate so callers can tell a missing key apart from a
/// bad ciphertext.
#[derive(Debug, Clone, Error)]
pub enum CryptError {
    /// Key material is not available
    #[error("Decrypt key {location} not exists. {hint}")]
    KeyNotFound {
        /// Where the key was expected
        location: String,
        /// How to provide the key
        hint: String,
    },

    /// Malformed ciphertext or wrong key
    #[error("Decrypt failure: {0}")]
    DecryptFailure(String),

    /// Key material exists but is unusable
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Encryption could not be performed
    #[error("Encrypt failure: {0}")]
    EncryptFailure(String),

    /// The key-management service could not be reached or failed
    #[error("Remote key service error: {0}")]
    Remote(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for ConfError {
    fn from(err: std::io::Error) -> Self {
        ConfError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_not_found_display() {
        let err = ConfError::AttrNotFound {
            path: "a.b.c".to_string(),
            missing: "b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Variable a.b.c not exist in the config file (missing `b`)"
        );
    }

    #[test]
    fn test_crypt_error_conversion() {
        let crypt_err = CryptError::DecryptFailure("bad token".to_string());
        let err: ConfError = crypt_err.into();
        assert!(matches!(err, ConfError::Crypt(_)));
    }

    #[test]
    fn test_crypt_error_exposed_from_decrypt() {
        let err = ConfError::Decrypt {
            field: "enc_password".to_string(),
            source: CryptError::KeyNotFound {
                location: "key.key".to_string(),
                hint: "set KEY_FILE".to_string(),
            },
        };
        assert!(matches!(
            err.crypt_error(),
            Some(CryptError::KeyNotFound { .. })
        ));
        assert!(err.to_string().contains("enc_password"));
    }

    #[test]
    fn test_crypt_error_absent_for_other_kinds() {
        let err = ConfError::ConfigNotFound("config.yml".to_string());
        assert!(err.crypt_error().is_none());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: ConfError = io_err.into();
        assert!(matches!(err, ConfError::Io(_)));
    }

    #[test]
    fn test_conf_error_implements_std_error() {
        let err = ConfError::ConfigStructureInvalid("missing root".to_string());
        let _: &dyn std::error::Error = &err;
    }
}

//! Crypt adapters
//!
//! A [`CryptAdapter`] turns the value of an `enc_` field into plaintext while
//! a [`ConfigTree`](crate::core::ConfigTree) is built. Three implementations
//! ship with the crate:
//!
//! - [`NoOpCrypt`] - identity; the default when nothing is configured
//! - [`LocalSymmetric`] - AES-256-GCM with a key file on disk
//! - [`RemoteKms`] - decryption delegated to a key-management service
//!
//! Adapters are shared between trees and threads behind an `Arc`.

pub mod factory;
pub mod kms;
pub mod local;
pub mod noop;

pub use factory::crypt_from_config;
pub use kms::RemoteKms;
pub use local::{generate_key, KeyMaterial, LocalSymmetric};
pub use noop::NoOpCrypt;

use crate::domain::errors::CryptError;

/// Encrypts and decrypts configuration values
///
/// Implementations must be safe to call from several threads at once.
pub trait CryptAdapter: Send + Sync {
    /// Short adapter name used in logs
    fn name(&self) -> &'static str;

    /// Encrypts a plaintext value into the text stored in the source
    ///
    /// # Errors
    ///
    /// Returns [`CryptError::KeyNotFound`] if no key is available and
    /// [`CryptError::EncryptFailure`] if encryption fails.
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptError>;

    /// Decrypts the text of an `enc_` field
    ///
    /// # Errors
    ///
    /// Returns [`CryptError::KeyNotFound`] if no key is available and
    /// [`CryptError::DecryptFailure`] for malformed ciphertext or a wrong key.
    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptError>;
}

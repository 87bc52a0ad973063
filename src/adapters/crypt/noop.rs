//! Identity adapter

use super::CryptAdapter;
use crate::domain::errors::CryptError;

/// Returns values unchanged in both directions
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCrypt;

impl CryptAdapter for NoOpCrypt {
    fn name(&self) -> &'static str {
        "none"
    }

    fn encrypt(&self, plaintext: &str) -> Result<String, CryptError> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptError> {
        Ok(ciphertext.to_string())
    }
}

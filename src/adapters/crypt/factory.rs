//! Crypt adapter factory

use super::{CryptAdapter, LocalSymmetric, NoOpCrypt, RemoteKms};
use crate::config::schema::{CryptConfig, CryptMethod};
use crate::domain::errors::ConfError;
use crate::domain::result::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Creates the adapter selected by a `crypt` block
///
/// `key_file` overrides `crypt.key_file` for the local adapter; with
/// neither, the key is located through `KEY_FILE` or `key.key`.
///
/// # Errors
///
/// Returns [`ConfError::Configuration`] if the block is invalid or the
/// remote client cannot be created.
pub fn crypt_from_config(
    config: &CryptConfig,
    key_file: Option<PathBuf>,
) -> Result<Arc<dyn CryptAdapter>> {
    config.validate().map_err(ConfError::Configuration)?;

    match config.method {
        CryptMethod::None => Ok(Arc::new(NoOpCrypt)),
        CryptMethod::Fernet => {
            let explicit = key_file.or_else(|| config.key_file.as_ref().map(PathBuf::from));
            let adapter = LocalSymmetric::new(explicit);
            tracing::info!(key_file = %adapter.key_path().display(), "Using local symmetric crypt");
            Ok(Arc::new(adapter))
        }
        CryptMethod::AwsKms => {
            let kms = config.kms.clone().ok_or_else(|| {
                ConfError::Configuration("crypt.kms block is required".to_string())
            })?;
            let adapter = RemoteKms::new(kms)?;
            tracing::info!(url = adapter.decrypt_url(), "Using remote key service crypt");
            Ok(Arc::new(adapter))
        }
    }
}

//! Remote key-management adapter
//!
//! Decryption is delegated to an HTTP key service exposing a KMS-style
//! `POST <endpoint>/decrypt`. The service never hands out key material, so
//! nothing is cached or persisted here. Values are encrypted out of band;
//! [`CryptAdapter::encrypt`] is the identity.

use super::CryptAdapter;
use crate::config::schema::KmsConfig;
use crate::domain::errors::{ConfError, CryptError};
use crate::domain::result::Result;
use base64::{engine::general_purpose, Engine as _};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct DecryptRequest<'a> {
    key_id: &'a str,
    ciphertext_blob: &'a str,
    encryption_algorithm: &'a str,
    grant_tokens: &'a [String],
}

#[derive(Debug, Deserialize)]
struct DecryptResponse {
    plaintext: String,
}

/// Adapter calling a remote key service
pub struct RemoteKms {
    config: KmsConfig,
    decrypt_url: String,
    client: Client,
}

impl RemoteKms {
    /// Creates the adapter and its HTTP client
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: KmsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ConfError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        let decrypt_url = format!("{}/decrypt", config.endpoint.trim_end_matches('/'));

        Ok(Self {
            config,
            decrypt_url,
            client,
        })
    }

    /// Endpoint receiving decrypt requests
    pub fn decrypt_url(&self) -> &str {
        &self.decrypt_url
    }
}

impl std::fmt::Debug for RemoteKms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteKms")
            .field("decrypt_url", &self.decrypt_url)
            .field("key_id", &self.config.key_id)
            .finish()
    }
}

impl CryptAdapter for RemoteKms {
    fn name(&self) -> &'static str {
        "aws_kms"
    }

    fn encrypt(&self, plaintext: &str) -> std::result::Result<String, CryptError> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, ciphertext: &str) -> std::result::Result<String, CryptError> {
        let body = DecryptRequest {
            key_id: &self.config.key_id,
            ciphertext_blob: ciphertext,
            encryption_algorithm: &self.config.encryption_algorithm,
            grant_tokens: &self.config.grant_tokens,
        };

        let mut request = self.client.post(&self.decrypt_url).json(&body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token.expose_secret().as_ref());
        }

        let resp = request.send().map_err(|e| {
            tracing::warn!(url = %self.decrypt_url, error = %e, "Key service unreachable");
            CryptError::Remote(format!("Failed to reach key service: {e}"))
        })?;

        let status = resp.status();
        match status {
            s if s.is_success() => {
                let decoded: DecryptResponse = resp.json().map_err(|e| {
                    CryptError::Remote(format!("Failed to parse key service response: {e}"))
                })?;
                let plaintext = general_purpose::STANDARD
                    .decode(decoded.plaintext.as_bytes())
                    .map_err(|e| {
                        CryptError::DecryptFailure(format!("plaintext is not base64: {e}"))
                    })?;
                String::from_utf8(plaintext)
                    .map_err(|_| CryptError::DecryptFailure("plaintext is not UTF-8".to_string()))
            }
            StatusCode::NOT_FOUND => Err(CryptError::KeyNotFound {
                location: self.config.key_id.clone(),
                hint: format!("The key service at {} does not know this key", self.decrypt_url),
            }),
            s if s.is_client_error() => {
                let body = resp.text().unwrap_or_default();
                Err(CryptError::DecryptFailure(format!(
                    "Key service rejected the ciphertext with status {status}: {body}"
                )))
            }
            _ => {
                let body = resp.text().unwrap_or_default();
                Err(CryptError::Remote(format!(
                    "Key service failed with status {status}: {body}"
                )))
            }
        }
    }
}

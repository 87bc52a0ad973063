//! Local symmetric adapter
//!
//! Keys are 32 bytes derived from a password with PBKDF2-HMAC-SHA512/256
//! (random 16-byte salt, 100 000 iterations) and stored URL-safe base64 in
//! the key file. Values are sealed with AES-256-GCM; a token is the URL-safe
//! base64 of `nonce || ciphertext || tag`.
//!
//! The key file is located like the configuration source: explicit path,
//! then `KEY_FILE` (legacy `PYMS_KEY_FILE`), then `key.key`.

use super::CryptAdapter;
use crate::config::cache::SourceCache;
use crate::config::loader::{Loader, SourceLocator, WriteMode};
use crate::config::{secret_string, SecretString};
use crate::domain::errors::{ConfError, CryptError};
use crate::domain::result::Result;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use rand::RngCore;
use secrecy::ExposeSecret;
use sha2::Sha512_256;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const PBKDF2_ITERATIONS: u32 = 100_000;

/// 32 bytes of symmetric key, zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial([u8; KEY_LEN]);

impl KeyMaterial {
    /// Wraps raw key bytes
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Derives a key from a password and a fresh random salt
    pub fn derive(password: &SecretString) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha512_256>(
            password.expose_secret().as_bytes(),
            &salt,
            PBKDF2_ITERATIONS,
            &mut key,
        );
        let material = Self(key);
        key.zeroize();
        material
    }

    /// Decodes the text stored in a key file
    ///
    /// # Errors
    ///
    /// Returns [`CryptError::InvalidKey`] unless the text is URL-safe base64
    /// of exactly 32 bytes.
    pub fn from_encoded(encoded: &str) -> std::result::Result<Self, CryptError> {
        let trimmed = encoded.trim();
        let mut decoded = URL_SAFE
            .decode(trimmed)
            .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed))
            .map_err(|e| CryptError::InvalidKey(format!("key is not URL-safe base64: {e}")))?;

        if decoded.len() != KEY_LEN {
            let len = decoded.len();
            decoded.zeroize();
            return Err(CryptError::InvalidKey(format!(
                "key must be {KEY_LEN} bytes, found {len}"
            )));
        }

        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(key))
    }

    /// URL-safe base64 text written to key files
    pub fn encode(&self) -> SecretString {
        secret_string(URL_SAFE.encode(self.0))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }

    /// Seals a plaintext into a token
    ///
    /// # Errors
    ///
    /// Returns [`CryptError::EncryptFailure`] if the cipher rejects the input.
    pub fn seal(&self, plaintext: &str) -> std::result::Result<String, CryptError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptError::EncryptFailure("AES-GCM encryption failed".to_string()))?;

        let mut token = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&ciphertext);
        Ok(URL_SAFE.encode(token))
    }

    /// Opens a token produced by [`KeyMaterial::seal`]
    ///
    /// # Errors
    ///
    /// Returns [`CryptError::DecryptFailure`] for malformed tokens, tokens
    /// sealed with another key and plaintexts that are not UTF-8.
    pub fn open(&self, token: &str) -> std::result::Result<String, CryptError> {
        let raw = URL_SAFE
            .decode(token.trim())
            .map_err(|e| CryptError::DecryptFailure(format!("token is not URL-safe base64: {e}")))?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptError::DecryptFailure("token is too short".to_string()));
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                CryptError::DecryptFailure("authentication failed: wrong key or tampered token".to_string())
            })?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptError::DecryptFailure("plaintext is not UTF-8".to_string()))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Derives a new key from a password
///
/// Two calls with the same password give different keys.
pub fn generate_key(password: &SecretString) -> KeyMaterial {
    KeyMaterial::derive(password)
}

fn parse_key_file(path: &Path) -> Result<KeyMaterial> {
    let mut contents = fs::read_to_string(path)?;
    let key = KeyMaterial::from_encoded(&contents);
    contents.zeroize();
    Ok(key?)
}

/// AES-256-GCM adapter backed by a key file
#[derive(Debug)]
pub struct LocalSymmetric {
    loader: Loader<KeyMaterial>,
}

impl LocalSymmetric {
    /// Creates an adapter for the key at `explicit`, or the environment/default path
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self::with_cache(explicit, SourceCache::shared())
    }

    /// Creates an adapter sharing a key cache with other adapters
    pub fn with_cache(explicit: Option<PathBuf>, cache: Arc<SourceCache<KeyMaterial>>) -> Self {
        Self {
            loader: Loader::new(SourceLocator::key_file(explicit), cache),
        }
    }

    /// Resolved key file path
    pub fn key_path(&self) -> PathBuf {
        self.loader.path()
    }

    fn key(&self) -> std::result::Result<Arc<KeyMaterial>, CryptError> {
        let key = self.loader.get(parse_key_file).map_err(|e| match e {
            ConfError::Crypt(crypt) => crypt,
            other => CryptError::InvalidKey(other.to_string()),
        })?;

        key.ok_or_else(|| CryptError::KeyNotFound {
            location: self.key_path().display().to_string(),
            hint: format!(
                "You need to create a key file with `conftree create-key` or set its path in {}",
                self.loader.locator().env().active_name()
            ),
        })
    }

    /// Derives a key from `password`, optionally writing it to the key file
    ///
    /// Returns the encoded key. An existing key file is never overwritten;
    /// call [`LocalSymmetric::delete_key`] first to rotate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::Configuration`] if the key file already exists
    /// and [`ConfError::Io`] if it cannot be written.
    pub fn generate_key(&self, password: &SecretString, write_to_file: bool) -> Result<SecretString> {
        let encoded = generate_key(password).encode();
        if write_to_file {
            let path = self
                .loader
                .write(encoded.expose_secret().as_bytes(), WriteMode::CreateNew)?;
            tracing::info!(path = %path.display(), "Key file created");
        }
        Ok(encoded)
    }

    /// Deletes the key file and forgets the cached key
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::Io`] if the file cannot be removed.
    pub fn delete_key(&self) -> Result<PathBuf> {
        let path = self.loader.remove()?;
        tracing::info!(path = %path.display(), "Key file deleted");
        Ok(path)
    }
}

impl CryptAdapter for LocalSymmetric {
    fn name(&self) -> &'static str {
        "fernet"
    }

    fn encrypt(&self, plaintext: &str) -> std::result::Result<String, CryptError> {
        self.key()?.seal(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> std::result::Result<String, CryptError> {
        self.key()?.open(ciphertext)
    }
}

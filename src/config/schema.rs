//! Configuration schema types
//!
//! Settings of the engine itself. [`CryptConfig`] is read from the `crypt`
//! block under the root namespace of the configuration source and decides
//! which adapter resolves `enc_` fields. [`LoggingConfig`] drives
//! [`crate::logging::init_logging`].

use crate::config::SecretString;
use serde::Deserialize;

/// Crypt adapter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CryptMethod {
    /// Identity pass-through
    #[default]
    None,
    /// Local symmetric key file
    #[serde(alias = "local")]
    Fernet,
    /// Remote key-management service
    #[serde(alias = "kms")]
    AwsKms,
}

/// The `<root>.crypt` block
///
/// ```yaml
/// pyms:
///   crypt:
///     method: "fernet"
///     key_file: "/etc/service/key.key"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CryptConfig {
    /// Which adapter resolves encrypted fields
    #[serde(default)]
    pub method: CryptMethod,

    /// Explicit key file location for the local adapter
    #[serde(default)]
    pub key_file: Option<String>,

    /// Remote key service settings (required for `aws_kms`)
    #[serde(default)]
    pub kms: Option<KmsConfig>,
}

impl CryptConfig {
    /// Validates the crypt block
    ///
    /// # Errors
    ///
    /// Returns an error if the selected method lacks its settings
    pub fn validate(&self) -> Result<(), String> {
        match self.method {
            CryptMethod::AwsKms => match &self.kms {
                Some(kms) => kms.validate(),
                None => Err("crypt.kms block is required when crypt.method = 'aws_kms'".to_string()),
            },
            CryptMethod::Fernet => match &self.key_file {
                Some(path) if path.trim().is_empty() => {
                    Err("crypt.key_file cannot be empty".to_string())
                }
                _ => Ok(()),
            },
            CryptMethod::None => Ok(()),
        }
    }
}

/// Remote key-management service settings
#[derive(Debug, Clone, Deserialize)]
pub struct KmsConfig {
    /// Base URL of the key service; `/decrypt` is appended
    pub endpoint: String,

    /// Key identifier sent with every decrypt request
    #[serde(default)]
    pub key_id: String,

    /// Algorithm name sent with every decrypt request
    #[serde(default = "default_encryption_algorithm")]
    pub encryption_algorithm: String,

    /// Grant tokens sent with every decrypt request
    #[serde(default)]
    pub grant_tokens: Vec<String>,

    /// Bearer token for the key service
    #[serde(default)]
    pub token: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_kms_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl KmsConfig {
    /// Creates settings for an endpoint with defaults for everything else
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            key_id: String::new(),
            encryption_algorithm: default_encryption_algorithm(),
            grant_tokens: Vec::new(),
            token: None,
            timeout_seconds: default_kms_timeout_seconds(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|e| format!("Invalid crypt.kms.endpoint '{}': {}", self.endpoint, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "crypt.kms.endpoint must use http or https, got '{}'",
                url.scheme()
            ));
        }
        if self.timeout_seconds == 0 {
            return Err("crypt.kms.timeout_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    /// Validates the logging settings
    ///
    /// # Errors
    ///
    /// Returns an error for unknown rotations or an empty path with file logging on
    pub fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path is required when local_enabled = true".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_encryption_algorithm() -> String {
    "SYMMETRIC_DEFAULT".to_string()
}

fn default_kms_timeout_seconds() -> u64 {
    10
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

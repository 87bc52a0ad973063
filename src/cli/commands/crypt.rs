//! Encrypt and decrypt command implementations

use crate::adapters::crypt::{CryptAdapter, LocalSymmetric};
use crate::cli::{exit_code, GlobalArgs, EXIT_OK};
use crate::domain::ConfError;
use clap::Args;

/// Arguments for the encrypt command
#[derive(Args, Debug, Clone)]
pub struct EncryptArgs {
    /// Plaintext to encrypt
    pub text: String,
}

impl EncryptArgs {
    /// Execute the encrypt command
    pub fn execute(&self, global: &GlobalArgs) -> anyhow::Result<i32> {
        let crypt = LocalSymmetric::new(global.key_file.clone());
        match crypt.encrypt(&self.text) {
            Ok(token) => {
                println!("{token}");
                Ok(EXIT_OK)
            }
            Err(e) => Ok(report("encrypt", e.into())),
        }
    }
}

/// Arguments for the decrypt command
#[derive(Args, Debug, Clone)]
pub struct DecryptArgs {
    /// Token produced by `conftree encrypt`
    pub token: String,
}

impl DecryptArgs {
    /// Execute the decrypt command
    pub fn execute(&self, global: &GlobalArgs) -> anyhow::Result<i32> {
        let crypt = LocalSymmetric::new(global.key_file.clone());
        match crypt.decrypt(&self.token) {
            Ok(plaintext) => {
                println!("{plaintext}");
                Ok(EXIT_OK)
            }
            Err(e) => Ok(report("decrypt", e.into())),
        }
    }
}

fn report(action: &str, error: ConfError) -> i32 {
    tracing::error!(action, error = %error, "Crypt command failed");
    println!("❌ Failed to {action}");
    println!("   Error: {error}");
    exit_code(&error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::EXIT_CONFIG_ERROR;
    use tempfile::TempDir;

    #[test]
    fn test_missing_key_is_config_error() {
        let dir = TempDir::new().unwrap();
        let global = GlobalArgs {
            config: None,
            key_file: Some(dir.path().join("key.key")),
        };

        let encrypt = EncryptArgs { text: "secret".to_string() };
        assert_eq!(encrypt.execute(&global).unwrap(), EXIT_CONFIG_ERROR);

        let decrypt = DecryptArgs { token: "token".to_string() };
        assert_eq!(decrypt.execute(&global).unwrap(), EXIT_CONFIG_ERROR);
    }
}

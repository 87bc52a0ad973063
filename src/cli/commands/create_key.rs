//! Create-key command implementation

use crate::adapters::crypt::LocalSymmetric;
use crate::cli::{exit_code, GlobalArgs, EXIT_CONFIG_ERROR, EXIT_OK};
use crate::config::secret_string;
use base64::{engine::general_purpose, Engine as _};
use clap::Args;
use rand::RngCore;
use secrecy::ExposeSecret;

/// Arguments for the create-key command
#[derive(Args, Debug, Clone)]
pub struct CreateKeyArgs {
    /// Password the key is derived from (random if omitted)
    #[arg(short, long, env = "CONFTREE_KEY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Print the key instead of writing the key file
    #[arg(long)]
    pub print: bool,

    /// Replace an existing key file
    #[arg(long)]
    pub force: bool,
}

impl CreateKeyArgs {
    /// Execute the create-key command
    pub fn execute(&self, global: &GlobalArgs) -> anyhow::Result<i32> {
        let crypt = LocalSymmetric::new(global.key_file.clone());
        let password = match &self.password {
            Some(password) => secret_string(password.clone()),
            None => {
                let mut bytes = [0u8; 32];
                rand::thread_rng().fill_bytes(&mut bytes);
                secret_string(general_purpose::STANDARD.encode(bytes))
            }
        };

        if self.print {
            let key = crypt.generate_key(&password, false)?;
            println!("{}", key.expose_secret().as_ref());
            return Ok(EXIT_OK);
        }

        let path = crypt.key_path();
        tracing::info!(path = %path.display(), "Creating key file");
        if path.exists() {
            if !self.force {
                println!("❌ Key file already exists: {}", path.display());
                println!("   Use --force to replace it");
                return Ok(EXIT_CONFIG_ERROR);
            }
            crypt.delete_key()?;
        }

        match crypt.generate_key(&password, true) {
            Ok(_) => {
                println!("✅ Key file created: {}", path.display());
                println!();
                println!("Next steps:");
                println!("  1. Encrypt values: conftree encrypt <TEXT>");
                println!("  2. Store them as `enc_<name>` fields");
                println!("  3. Select the adapter with `crypt: {{method: fernet}}` under your root block");
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to create key file");
                println!("   Error: {e}");
                Ok(exit_code(&e))
            }
        }
    }
}

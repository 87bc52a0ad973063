//! Get command implementation

use crate::cli::{exit_code, GlobalArgs, EXIT_OK};
use clap::Args;

/// Arguments for the get command
#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// Dotted path, e.g. `pyms.config.DEBUG`
    pub path: String,

    /// Print `{}` for missing paths instead of failing
    #[arg(long)]
    pub empty_init: bool,
}

impl GetArgs {
    /// Execute the get command
    pub fn execute(&self, global: &GlobalArgs) -> anyhow::Result<i32> {
        let resolver = global.resolver_builder().empty_init(self.empty_init).build();

        let value = resolver
            .resolve("")
            .and_then(|root| root.get(&self.path));

        match value {
            Ok(value) => {
                println!("{}", serde_json::to_string_pretty(&value.to_json())?);
                Ok(EXIT_OK)
            }
            Err(e) => {
                tracing::error!(path = %self.path, error = %e, "Lookup failed");
                println!("❌ {e}");
                Ok(exit_code(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::EXIT_CONFIG_ERROR;
    use tempfile::TempDir;

    #[test]
    fn test_get_existing_and_missing_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "pyms:\n  config:\n    app-name: demo\n").unwrap();
        let global = GlobalArgs {
            config: Some(path),
            key_file: None,
        };

        let found = GetArgs {
            path: "pyms.config.app_name".to_string(),
            empty_init: false,
        };
        assert_eq!(found.execute(&global).unwrap(), EXIT_OK);

        let missing = GetArgs {
            path: "pyms.nothing".to_string(),
            empty_init: false,
        };
        assert_eq!(missing.execute(&global).unwrap(), EXIT_CONFIG_ERROR);

        let relaxed = GetArgs {
            path: "pyms.nothing".to_string(),
            empty_init: true,
        };
        assert_eq!(relaxed.execute(&global).unwrap(), EXIT_OK);
    }
}

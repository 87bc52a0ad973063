//! Validate command implementation
//!
//! Loads the configuration source, resolves every `enc_` field and checks
//! the root block structure.

use crate::cli::{exit_code, GlobalArgs, EXIT_OK};
use crate::config::env::DEFAULT_ROOT_NAMESPACE;
use crate::core::validate::{StructureRules, DEFAULT_ROOT_KEYWORDS};
use clap::Args;

/// Arguments for the validate command
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Root block the configuration must live under
    #[arg(long, default_value = DEFAULT_ROOT_NAMESPACE)]
    pub root: String,
}

impl ValidateArgs {
    /// Execute the validate command
    pub fn execute(&self, global: &GlobalArgs) -> anyhow::Result<i32> {
        let rules = StructureRules::new(self.root.as_str())
            .require_block("config")
            .allow_only(DEFAULT_ROOT_KEYWORDS);
        let resolver = global.resolver_builder().structure_rules(rules).build();
        let source = resolver
            .source_path()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string());

        tracing::info!(source = %source, root = %self.root, "Validating configuration");
        println!("🔍 Validating configuration file: {source}");
        println!();

        match resolver.resolve(&self.root) {
            Ok(root) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Root block: {}", self.root);
                println!("  Blocks: {}", root.keys().collect::<Vec<_>>().join(", "));
                println!("  Crypt adapter: {}", root.crypt().name());
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(exit_code(&e))
            }
        }
    }
}

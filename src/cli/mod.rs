//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for conftree using clap.

pub mod commands;

use crate::core::{Resolver, ResolverBuilder};
use crate::domain::ConfError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Exit code for a successful command
pub const EXIT_OK: i32 = 0;

/// Exit code for configuration, key or decrypt errors
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Exit code for anything else
pub const EXIT_FATAL: i32 = 5;

/// conftree - configuration resolution with encrypted fields
#[derive(Parser, Debug)]
#[command(name = "conftree")]
#[command(version, about, long_about = None)]
#[command(author = "Conftree Contributors")]
pub struct Cli {
    /// Source locations
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CONFTREE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file or directory (default: CONFIGMAP_FILE, then ./config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Key file (default: KEY_FILE, then ./key.key)
    #[arg(short, long, global = true)]
    pub key_file: Option<PathBuf>,
}

impl GlobalArgs {
    /// Resolver builder for the configured source and key file
    pub fn resolver_builder(&self) -> ResolverBuilder {
        let mut builder = match &self.config {
            Some(path) => Resolver::builder().path(path),
            None => Resolver::builder(),
        };
        if let Some(key_file) = &self.key_file {
            builder = builder.key_file(key_file);
        }
        builder
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Derive a new key and write it to the key file
    CreateKey(commands::create_key::CreateKeyArgs),

    /// Encrypt a value with the local key
    Encrypt(commands::crypt::EncryptArgs),

    /// Decrypt a value with the local key
    Decrypt(commands::crypt::DecryptArgs),

    /// Validate the configuration structure
    Validate(commands::validate::ValidateArgs),

    /// Print the value at a dotted path
    Get(commands::get::GetArgs),

    /// Resolve a namespace and reload it on SIGHUP
    Watch(commands::watch::WatchArgs),
}

/// Exit code for a failed command
pub fn exit_code(error: &ConfError) -> i32 {
    match error {
        ConfError::Io(_) => EXIT_FATAL,
        _ => EXIT_CONFIG_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_create_key() {
        let cli = Cli::parse_from(["conftree", "create-key", "--password", "1234"]);
        assert!(cli.global.config.is_none());
        match cli.command {
            Commands::CreateKey(args) => {
                assert_eq!(args.password.as_deref(), Some("1234"));
                assert!(!args.force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_paths() {
        let cli = Cli::parse_from([
            "conftree",
            "--config",
            "custom.yml",
            "get",
            "pyms.config.DEBUG",
            "--key-file",
            "custom.key",
        ]);
        assert_eq!(cli.global.config, Some(PathBuf::from("custom.yml")));
        assert_eq!(cli.global.key_file, Some(PathBuf::from("custom.key")));
        assert!(matches!(cli.command, Commands::Get(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["conftree", "--log-level", "debug", "validate"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_root() {
        let cli = Cli::parse_from(["conftree", "validate", "--root", "app"]);
        match cli.command {
            Commands::Validate(args) => assert_eq!(args.root, "app"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_encrypt_decrypt_watch() {
        let cli = Cli::parse_from(["conftree", "encrypt", "http://db"]);
        assert!(matches!(cli.command, Commands::Encrypt(_)));

        let cli = Cli::parse_from(["conftree", "decrypt", "token"]);
        assert!(matches!(cli.command, Commands::Decrypt(_)));

        let cli = Cli::parse_from(["conftree", "watch", "pyms.config"]);
        assert!(matches!(cli.command, Commands::Watch(_)));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&ConfError::ConfigNotFound("x".into())), EXIT_CONFIG_ERROR);
        assert_eq!(exit_code(&ConfError::Io("x".into())), EXIT_FATAL);
    }
}

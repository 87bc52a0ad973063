// Conftree - Configuration resolution engine
// Copyright (c) 2025 Conftree Contributors
// Licensed under the MIT License

//! # Conftree - configuration resolution for services
//!
//! Conftree loads a service's configuration from a YAML, JSON or TOML file
//! (or an in-memory mapping), normalizes its keys, decrypts `enc_` fields
//! through a pluggable adapter, and serves namespace-scoped views that can be
//! reloaded atomically while readers keep working.
//!
//! ## Architecture
//!
//! - [`config`] - source location, parsing and caching
//! - [`core`] - the configuration tree, resolver and structure rules
//! - [`adapters`] - crypt adapters (identity, local key file, remote key service)
//! - [`domain`] - error types
//! - [`logging`] - structured logging
//! - [`cli`] - the `conftree` command-line tool
//!
//! ## Quick Start
//!
//! ```yaml
//! pyms:
//!   crypt:
//!     method: fernet
//!   config:
//!     DEBUG: true
//!     app-name: demo
//!     enc_database_url: "gAAAAABe..."
//! ```
//!
//! ```rust,no_run
//! use conftree::core::Resolver;
//!
//! # fn main() -> conftree::domain::Result<()> {
//! // CONFIGMAP_FILE, then ./config.yml
//! let resolver = Resolver::from_env();
//!
//! let config = resolver.resolve("pyms.config")?;
//! assert_eq!(config.get("app_name")?, "demo");
//! let database_url = config.get_str("database_url")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Missing keys
//!
//! By default a missing key is an error. With `empty_init`, it yields an
//! empty tree at any depth:
//!
//! ```rust
//! use conftree::core::Resolver;
//! use serde_json::json;
//!
//! let serde_json::Value::Object(raw) = json!({"pyms": {"config": {}}}) else { unreachable!() };
//! let resolver = Resolver::builder().mapping(raw).empty_init(true).build();
//!
//! let services = resolver.resolve("pyms.services").unwrap();
//! assert!(services.get("tracer.host").unwrap().is_empty_tree());
//! ```
//!
//! ## Reload
//!
//! [`core::Resolver::reload`] builds a complete new generation, decrypts
//! included, before swapping it in. If anything fails, the previous
//! generation keeps being served and the error is returned.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

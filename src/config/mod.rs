//! Configuration sourcing for conftree.
//!
//! - [`env`] - environment variable names and default filenames
//! - [`loader`] - locating, parsing and caching sources
//! - [`cache`] - the path-keyed cache shared by loaders
//! - [`schema`] - settings of the engine itself (crypt, logging)
//! - [`secret`] - redacted, zeroed-on-drop secret strings
//!
//! # Source location
//!
//! ```bash
//! export CONFIGMAP_FILE=/etc/service/config.yml
//! export KEY_FILE=/etc/service/key.key
//! ```
//!
//! The legacy names `PYMS_CONFIGMAP_FILE` and `PYMS_KEY_FILE` are still read
//! and log a deprecation warning. Without either, `config.yml` and `key.key`
//! in the working directory are used.
//!
//! # Example
//!
//! ```rust,no_run
//! use conftree::config::{parse_config_file, Loader, SourceCache, SourceLocator};
//!
//! # fn example() -> conftree::domain::Result<()> {
//! let loader = Loader::new(SourceLocator::config(None), SourceCache::shared());
//! if let Some(raw) = loader.get(parse_config_file)? {
//!     println!("{} top-level keys", raw.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod env;
pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use cache::SourceCache;
pub use env::EnvKey;
pub use loader::{
    parse_config_file, parse_config_str, Loader, RawMapping, SourceFormat, SourceLocator,
    WriteMode,
};
pub use schema::{CryptConfig, CryptMethod, KmsConfig, LoggingConfig};
pub use secret::{secret_string, SecretString, SecretValue};

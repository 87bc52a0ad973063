//! Core of the configuration engine
//!
//! - [`tree`] - normalized, decryption-resolved [`ConfigTree`]
//! - [`value`] - leaf and block values stored in a tree
//! - [`resolver`] - namespace resolution, memoization and atomic reload
//! - [`validate`] - root-level structure rules
//!
//! # Example
//!
//! ```rust,no_run
//! use conftree::core::Resolver;
//!
//! # fn example() -> conftree::domain::Result<()> {
//! let resolver = Resolver::builder().path("config.yml").build();
//!
//! let config = resolver.resolve("pyms.config")?;
//! println!("DEBUG = {:?}", config.get("DEBUG")?);
//!
//! // Later, e.g. on SIGHUP
//! let generation = resolver.reload()?;
//! println!("Serving generation {generation}");
//! # Ok(())
//! # }
//! ```

pub mod resolver;
pub mod tree;
pub mod validate;
pub mod value;

pub use resolver::{ConfigSource, ResolveOptions, Resolver, ResolverBuilder};
pub use tree::{normalize_key, ConfigTree};
pub use validate::StructureRules;
pub use value::Value;

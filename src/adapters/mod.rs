//! External integrations for conftree.
//!
//! - [`crypt`] - adapters resolving `enc_` fields (identity, local key file,
//!   remote key service)
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with mock implementations. Trees hold their adapter as
//! `Arc<dyn CryptAdapter>`, so any implementation can be injected:
//!
//! ```rust,no_run
//! use conftree::adapters::crypt::LocalSymmetric;
//! use conftree::core::Resolver;
//! use std::sync::Arc;
//!
//! # fn example() -> conftree::domain::Result<()> {
//! let crypt = Arc::new(LocalSymmetric::new(Some("/etc/service/key.key".into())));
//! let resolver = Resolver::builder().path("config.yml").crypt(crypt).build();
//! let config = resolver.resolve("pyms.config")?;
//! # Ok(())
//! # }
//! ```

pub mod crypt;

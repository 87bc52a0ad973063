//! Domain types shared by every layer of conftree.
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, ConfError>`]:
//!
//! ```rust
//! use conftree::domain::{ConfError, Result};
//!
//! fn example() -> Result<()> {
//!     let tree = conftree::core::ConfigTree::empty(false);
//!     let _ = tree.get("missing")?;
//!     Ok(())
//! }
//! assert!(matches!(example(), Err(ConfError::AttrNotFound { .. })));
//! ```

pub mod errors;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{ConfError, CryptError};
pub use result::Result;

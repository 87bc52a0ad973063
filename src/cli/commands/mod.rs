//! CLI command implementations
//!
//! Every command returns its exit code; errors are reported on stdout and
//! mapped with [`super::exit_code`].

pub mod create_key;
pub mod crypt;
pub mod get;
pub mod validate;
pub mod watch;

//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - human-readable console output on stderr
//! - optional JSON file output with rotation
//! - level from the command line, overridable with `RUST_LOG`
//!
//! # Example
//!
//! ```no_run
//! use conftree::logging::init_logging;
//! use conftree::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Service started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log that a configuration generation is being served
///
/// # Example
///
/// ```no_run
/// use conftree::log_generation_published;
///
/// log_generation_published!(3u64, "/etc/service/config.yml");
/// ```
#[macro_export]
macro_rules! log_generation_published {
    ($generation:expr, $source:expr) => {
        tracing::info!(
            generation = $generation,
            source = %$source,
            "Configuration generation published"
        );
    };
}

/// Log a reload that failed while an earlier generation keeps being served
///
/// # Example
///
/// ```no_run
/// use conftree::log_reload_failed;
/// use conftree::domain::ConfError;
///
/// let error = ConfError::ConfigNotFound("config.yml".to_string());
/// log_reload_failed!(Some(2u64), &error);
/// ```
#[macro_export]
macro_rules! log_reload_failed {
    ($serving:expr, $error:expr) => {
        tracing::error!(
            serving = ?$serving,
            error = %$error,
            "Configuration reload failed"
        );
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand() {
        let error = crate::domain::ConfError::Configuration("bad".to_string());
        crate::log_generation_published!(1u64, "mapping");
        crate::log_reload_failed!(None::<u64>, &error);
    }
}

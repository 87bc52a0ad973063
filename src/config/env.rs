//! Environment variables and default filenames
//!
//! Every location the engine reads from the environment has a canonical
//! variable and a deprecated legacy alias. The canonical variable wins when
//! both are set; reading the legacy alias logs a deprecation warning.

/// Canonical variable pointing at the configuration source
pub const CONFIGMAP_FILE_ENVIRONMENT: &str = "CONFIGMAP_FILE";

/// Deprecated alias of [`CONFIGMAP_FILE_ENVIRONMENT`]
pub const CONFIGMAP_FILE_ENVIRONMENT_LEGACY: &str = "PYMS_CONFIGMAP_FILE";

/// Canonical variable pointing at the local symmetric key file
pub const KEY_FILE_ENVIRONMENT: &str = "KEY_FILE";

/// Deprecated alias of [`KEY_FILE_ENVIRONMENT`]
pub const KEY_FILE_ENVIRONMENT_LEGACY: &str = "PYMS_KEY_FILE";

/// Filename used when no configuration path is given, or appended to directories
pub const DEFAULT_CONFIG_FILENAME: &str = "config.yml";

/// Filename used when no key path is given, or appended to directories
pub const DEFAULT_KEY_FILENAME: &str = "key.key";

/// Top-level block every service configuration lives under
pub const DEFAULT_ROOT_NAMESPACE: &str = "pyms";

/// An environment variable with an optional deprecated alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvKey {
    /// Current variable name
    pub canonical: &'static str,
    /// Deprecated variable name still honored
    pub legacy: Option<&'static str>,
}

impl EnvKey {
    /// Location of the configuration source
    pub const CONFIG_FILE: EnvKey = EnvKey {
        canonical: CONFIGMAP_FILE_ENVIRONMENT,
        legacy: Some(CONFIGMAP_FILE_ENVIRONMENT_LEGACY),
    };

    /// Location of the local symmetric key
    pub const KEY_FILE: EnvKey = EnvKey {
        canonical: KEY_FILE_ENVIRONMENT,
        legacy: Some(KEY_FILE_ENVIRONMENT_LEGACY),
    };

    /// Reads the variable, falling back to the legacy alias
    ///
    /// Empty values count as unset.
    pub fn lookup(&self) -> Option<String> {
        if let Some(value) = read_non_empty(self.canonical) {
            return Some(value);
        }

        let legacy = self.legacy?;
        let value = read_non_empty(legacy)?;
        tracing::warn!(
            legacy = legacy,
            canonical = self.canonical,
            "Environment variable {} is deprecated, use {} instead",
            legacy,
            self.canonical
        );
        Some(value)
    }

    /// Name of the variable currently in effect, for diagnostics
    pub fn active_name(&self) -> &'static str {
        match self.legacy {
            Some(legacy)
                if read_non_empty(self.canonical).is_none()
                    && read_non_empty(legacy).is_some() =>
            {
                legacy
            }
            _ => self.canonical,
        }
    }
}

fn read_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

//! Source loading with path-keyed caching
//!
//! A [`Loader`] answers two questions: *where* the bytes of a source live
//! and *what* they parse to. Location follows a fixed precedence:
//!
//! 1. an explicit path given by the caller
//! 2. the path in the environment variable (canonical, then legacy alias)
//! 3. the default filename in the working directory
//!
//! A directory gets the default filename appended. A file that does not exist
//! is not an error: [`Loader::get`] returns `None` and the caller decides
//! whether an empty source is fatal.
//!
//! Parsed values are cached by resolved absolute path in a shared
//! [`SourceCache`]; only [`Loader::reload`], [`Loader::write`] and
//! [`Loader::remove`] evict entries.

use super::cache::SourceCache;
use super::env::{EnvKey, DEFAULT_CONFIG_FILENAME, DEFAULT_KEY_FILENAME};
use crate::domain::errors::ConfError;
use crate::domain::result::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Raw parsed mapping, before normalization and decryption
pub type RawMapping = serde_json::Map<String, serde_json::Value>;

/// Resolves the location of a file-backed source
#[derive(Debug, Clone)]
pub struct SourceLocator {
    explicit: Option<PathBuf>,
    env: EnvKey,
    default_filename: &'static str,
}

impl SourceLocator {
    /// Creates a locator from its parts
    pub fn new(explicit: Option<PathBuf>, env: EnvKey, default_filename: &'static str) -> Self {
        Self {
            explicit,
            env,
            default_filename,
        }
    }

    /// Locator for the configuration source (`CONFIGMAP_FILE`, `config.yml`)
    pub fn config(explicit: Option<PathBuf>) -> Self {
        Self::new(explicit, EnvKey::CONFIG_FILE, DEFAULT_CONFIG_FILENAME)
    }

    /// Locator for the local symmetric key (`KEY_FILE`, `key.key`)
    pub fn key_file(explicit: Option<PathBuf>) -> Self {
        Self::new(explicit, EnvKey::KEY_FILE, DEFAULT_KEY_FILENAME)
    }

    /// Environment variable consulted when no explicit path is set
    pub fn env(&self) -> EnvKey {
        self.env
    }

    /// Resolves the absolute path of the source
    ///
    /// The path does not need to exist.
    pub fn resolve(&self) -> PathBuf {
        let candidate = match &self.explicit {
            Some(path) => path.clone(),
            None => match self.env.lookup() {
                Some(value) => {
                    tracing::debug!(
                        env = self.env.active_name(),
                        path = %value,
                        "Searching file in environment"
                    );
                    PathBuf::from(value)
                }
                None => PathBuf::from(self.default_filename),
            },
        };

        let candidate = if candidate.is_dir() {
            candidate.join(self.default_filename)
        } else {
            candidate
        };

        absolutize(&candidate)
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// How [`Loader::write`] treats an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file if it exists
    Overwrite,
    /// Fail if the file exists
    CreateNew,
}

/// Loads and caches one file-backed source
#[derive(Debug)]
pub struct Loader<T> {
    locator: SourceLocator,
    cache: Arc<SourceCache<T>>,
    last_path: Mutex<Option<PathBuf>>,
}

impl<T> Loader<T> {
    /// Creates a loader backed by a shared cache
    pub fn new(locator: SourceLocator, cache: Arc<SourceCache<T>>) -> Self {
        Self {
            locator,
            cache,
            last_path: Mutex::new(None),
        }
    }

    /// Locator used by this loader
    pub fn locator(&self) -> &SourceLocator {
        &self.locator
    }

    /// Cache shared by this loader
    pub fn cache(&self) -> &Arc<SourceCache<T>> {
        &self.cache
    }

    /// Current resolved path of the source
    pub fn path(&self) -> PathBuf {
        self.locator.resolve()
    }

    /// Returns the parsed source, reading it only on a cache miss
    ///
    /// # Errors
    ///
    /// Returns whatever `parse` returns for an existing file.
    pub fn get<F>(&self, parse: F) -> Result<Option<Arc<T>>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let path = self.path();
        self.remember(&path);

        if let Some(cached) = self.cache.get(&path) {
            return Ok(Some(cached));
        }

        if !path.is_file() {
            tracing::debug!(path = %path.display(), "File NOT FOUND");
            return Ok(None);
        }

        tracing::debug!(path = %path.display(), "Source found, parsing");
        let parsed = Arc::new(parse(&path)?);
        self.cache.insert(path, Arc::clone(&parsed));
        Ok(Some(parsed))
    }

    /// Evicts the cached entry and parses the source again
    ///
    /// If the resolved path changed since the last read, the entry for the
    /// previous path is evicted too. On a parse failure the entry stays
    /// evicted.
    ///
    /// # Errors
    ///
    /// Returns whatever `parse` returns.
    pub fn reload<F>(&self, parse: F) -> Result<Option<Arc<T>>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let previous = self
            .last_path
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(previous) = previous {
            self.cache.evict(&previous);
        }
        self.cache.evict(&self.path());
        self.get(parse)
    }

    /// Writes `content` at the resolved path and evicts it from the cache
    ///
    /// # Errors
    ///
    /// Returns an I/O error, or a configuration error when `mode` is
    /// [`WriteMode::CreateNew`] and the file exists.
    pub fn write(&self, content: &[u8], mode: WriteMode) -> Result<PathBuf> {
        let path = self.path();
        let mut options = fs::OpenOptions::new();
        options.write(true);
        match mode {
            WriteMode::Overwrite => options.create(true).truncate(true),
            WriteMode::CreateNew => options.create_new(true),
        };

        let mut file = options.open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => ConfError::Configuration(format!(
                "Refusing to overwrite existing file {}",
                path.display()
            )),
            _ => ConfError::Io(format!("Failed to open {}: {}", path.display(), e)),
        })?;
        file.write_all(content)
            .map_err(|e| ConfError::Io(format!("Failed to write {}: {}", path.display(), e)))?;

        self.cache.evict(&path);
        tracing::info!(path = %path.display(), "File written");
        Ok(path)
    }

    /// Deletes the file at the resolved path and evicts it from the cache
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be removed.
    pub fn remove(&self) -> Result<PathBuf> {
        let path = self.path();
        self.cache.evict(&path);
        fs::remove_file(&path)
            .map_err(|e| ConfError::Io(format!("Failed to remove {}: {}", path.display(), e)))?;
        Ok(path)
    }

    fn remember(&self, path: &Path) {
        *self.last_path.lock().unwrap_or_else(|e| e.into_inner()) = Some(path.to_path_buf());
    }
}

/// Serialization format of a configuration source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// YAML (default)
    Yaml,
    /// JSON
    Json,
    /// TOML
    Toml,
}

impl SourceFormat {
    /// Picks the format from the file extension; unknown extensions are YAML
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => SourceFormat::Json,
            Some("toml") => SourceFormat::Toml,
            _ => SourceFormat::Yaml,
        }
    }
}

/// Reads and parses a configuration file into a raw mapping
///
/// # Errors
///
/// Returns [`ConfError::Io`] if the file cannot be read and
/// [`ConfError::Parse`] if it is malformed or its root is not a mapping.
pub fn parse_config_file(path: &Path) -> Result<RawMapping> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfError::Io(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_config_str(&contents, SourceFormat::from_path(path)).map_err(|message| {
        ConfError::Parse {
            path: path.to_path_buf(),
            message,
        }
    })
}

/// Parses configuration text into a raw mapping
///
/// An empty document is an empty mapping.
///
/// # Errors
///
/// Returns the parser diagnostic, or a message when the root is not a mapping.
pub fn parse_config_str(
    contents: &str,
    format: SourceFormat,
) -> std::result::Result<RawMapping, String> {
    if contents.trim().is_empty() {
        return Ok(RawMapping::new());
    }

    let value: serde_json::Value = match format {
        SourceFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string())?,
        SourceFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string())?,
        SourceFormat::Toml => toml::from_str(contents).map_err(|e| e.to_string())?,
    };

    match value {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(RawMapping::new()),
        other => Err(format!(
            "root value must be a mapping, found {}",
            json_type_name(&other)
        )),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "a mapping",
    }
}

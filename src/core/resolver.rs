//! Namespace resolution, memoization and reload
//!
//! A [`Resolver`] owns one configuration source and serves subtrees of it by
//! dotted namespace (`"pyms.config"`, `"pyms.services.requests"`). The root
//! tree of the current source lives in an immutable *generation*:
//!
//! - the first [`Resolver::resolve`] loads generation 0; while the source
//!   does not exist, `empty_init` resolutions get an empty tree and nothing
//!   is published;
//! - [`Resolver::reload`] reads the source again, validates it, rebuilds the
//!   whole tree including every decrypt, and only then publishes generation
//!   `n + 1` with an atomic pointer swap;
//! - a failed reload leaves generation `n` in place and returns the error.
//!
//! Readers never take a lock to reach the current generation. Memoized
//! subtrees are stored per generation, so a reload drops them all at once.

use super::tree::ConfigTree;
use super::validate::StructureRules;
use crate::adapters::crypt::{crypt_from_config, CryptAdapter, NoOpCrypt};
use crate::config::cache::SourceCache;
use crate::config::env::DEFAULT_ROOT_NAMESPACE;
use crate::config::loader::{parse_config_file, Loader, RawMapping, SourceLocator};
use crate::config::schema::CryptConfig;
use crate::core::tree::normalize_key;
use crate::domain::errors::ConfError;
use crate::domain::result::Result;
use arc_swap::ArcSwapOption;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

/// Where a resolver reads its configuration from
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// An in-memory mapping; never read from disk
    Mapping(RawMapping),
    /// An explicit file or directory
    Path(PathBuf),
    /// `CONFIGMAP_FILE` (legacy `PYMS_CONFIGMAP_FILE`), then `config.yml`
    Environment,
}

/// Per-call resolution settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Missing keys yield empty trees instead of errors
    pub empty_init: bool,
    /// Reuse the subtree built by an earlier call in the same generation
    pub memoize: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            empty_init: false,
            memoize: true,
        }
    }
}

type MemoKey = (String, bool);

/// One immutable version of the resolved configuration
struct Generation {
    number: u64,
    raw: Arc<RawMapping>,
    root: Arc<ConfigTree>,
    crypt: Arc<dyn CryptAdapter>,
    memo: RwLock<HashMap<MemoKey, Arc<ConfigTree>>>,
}

enum SourceReader {
    Mapping(Arc<RawMapping>),
    File(Loader<RawMapping>),
}

/// Builder for [`Resolver`]
pub struct ResolverBuilder {
    source: ConfigSource,
    defaults: ResolveOptions,
    crypt: Option<Arc<dyn CryptAdapter>>,
    key_file: Option<PathBuf>,
    rules: Option<StructureRules>,
    cache: Option<Arc<SourceCache<RawMapping>>>,
}

impl ResolverBuilder {
    fn new() -> Self {
        Self {
            source: ConfigSource::Environment,
            defaults: ResolveOptions::default(),
            crypt: None,
            key_file: None,
            rules: None,
            cache: None,
        }
    }

    /// Sets the configuration source
    pub fn source(mut self, source: ConfigSource) -> Self {
        self.source = source;
        self
    }

    /// Reads configuration from an in-memory mapping
    pub fn mapping(self, mapping: RawMapping) -> Self {
        self.source(ConfigSource::Mapping(mapping))
    }

    /// Reads configuration from a file or directory
    pub fn path(self, path: impl Into<PathBuf>) -> Self {
        self.source(ConfigSource::Path(path.into()))
    }

    /// Default `empty_init` for [`Resolver::resolve`] and for a missing source
    pub fn empty_init(mut self, empty_init: bool) -> Self {
        self.defaults.empty_init = empty_init;
        self
    }

    /// Default memoization for [`Resolver::resolve`]
    pub fn memoize(mut self, memoize: bool) -> Self {
        self.defaults.memoize = memoize;
        self
    }

    /// Uses this adapter instead of the source's `crypt` block
    pub fn crypt(mut self, crypt: Arc<dyn CryptAdapter>) -> Self {
        self.crypt = Some(crypt);
        self
    }

    /// Key file for a local adapter selected by the source
    pub fn key_file(mut self, key_file: impl Into<PathBuf>) -> Self {
        self.key_file = Some(key_file.into());
        self
    }

    /// Validates every generation with these rules before publishing it
    pub fn structure_rules(mut self, rules: StructureRules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Shares a parsed-source cache with other resolvers
    pub fn cache(mut self, cache: Arc<SourceCache<RawMapping>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Creates the resolver; nothing is read until the first resolution
    pub fn build(self) -> Resolver {
        let reader = match self.source {
            ConfigSource::Mapping(mapping) => SourceReader::Mapping(Arc::new(mapping)),
            ConfigSource::Path(path) => SourceReader::File(Loader::new(
                SourceLocator::config(Some(path)),
                self.cache.unwrap_or_default(),
            )),
            ConfigSource::Environment => SourceReader::File(Loader::new(
                SourceLocator::config(None),
                self.cache.unwrap_or_default(),
            )),
        };

        Resolver {
            reader,
            defaults: self.defaults,
            crypt: self.crypt,
            key_file: self.key_file,
            rules: self.rules,
            current: ArcSwapOption::empty(),
            reload_lock: Mutex::new(()),
        }
    }
}

/// Resolves namespaces against a reloadable configuration source
pub struct Resolver {
    reader: SourceReader,
    defaults: ResolveOptions,
    crypt: Option<Arc<dyn CryptAdapter>>,
    key_file: Option<PathBuf>,
    rules: Option<StructureRules>,
    current: ArcSwapOption<Generation>,
    reload_lock: Mutex<()>,
}

impl Resolver {
    /// Starts building a resolver
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    /// Resolver over the environment-pointed source with default options
    pub fn from_env() -> Self {
        Self::builder().build()
    }

    /// Path of the file-backed source, `None` for an in-memory mapping
    pub fn source_path(&self) -> Option<PathBuf> {
        match &self.reader {
            SourceReader::Mapping(_) => None,
            SourceReader::File(loader) => Some(loader.path()),
        }
    }

    /// Number of the published generation, `None` before the first load
    pub fn generation(&self) -> Option<u64> {
        self.current.load().as_ref().map(|g| g.number)
    }

    /// Root tree of the published generation, `None` before the first load
    pub fn current(&self) -> Option<Arc<ConfigTree>> {
        self.current.load_full().map(|g| Arc::clone(&g.root))
    }

    /// Resolves a namespace with the resolver's default options
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve_with`].
    pub fn resolve(&self, namespace: &str) -> Result<Arc<ConfigTree>> {
        self.resolve_with(namespace, self.defaults)
    }

    /// Resolves a namespace to a subtree
    ///
    /// An empty namespace returns the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::ConfigNotFound`] if no source exists and
    /// `empty_init` is off (with it on, an empty tree is returned and no
    /// generation is published), [`ConfError::AttrNotFound`] for a missing
    /// namespace without `empty_init`, [`ConfError::ConfigStructureInvalid`]
    /// if the namespace holds a value instead of a block, and any load or
    /// decrypt error of the first generation.
    pub fn resolve_with(&self, namespace: &str, options: ResolveOptions) -> Result<Arc<ConfigTree>> {
        let Some(generation) = self.ensure_loaded(options.empty_init)? else {
            // No source yet: nothing is published, so a later call picks the file up.
            return Ok(Arc::new(ConfigTree::empty_with_crypt(true, self.unloaded_crypt())));
        };

        if !options.memoize {
            let root =
                ConfigTree::from_mapping(&generation.raw, options.empty_init, Arc::clone(&generation.crypt))?;
            return Ok(Arc::new(subtree(&root, namespace, options.empty_init)?));
        }

        let key = (normalize_key(namespace), options.empty_init);
        if let Some(hit) = generation
            .memo
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Ok(Arc::clone(hit));
        }

        let resolved = subtree(&generation.root, namespace, options.empty_init)?
            .with_empty_init(options.empty_init);
        let mut memo = generation.memo.write().unwrap_or_else(|e| e.into_inner());
        // A concurrent caller may have stored it first; keep theirs.
        let entry = memo.entry(key).or_insert_with(|| Arc::new(resolved));
        Ok(Arc::clone(entry))
    }

    /// Reads the source again and publishes a new generation
    ///
    /// Returns the number of the generation now being served. A caller that
    /// waited while another reload published a newer generation gets that
    /// one back without reading the source again.
    ///
    /// # Errors
    ///
    /// Returns the load, validation or decrypt error, and
    /// [`ConfError::ConfigNotFound`] if the source has disappeared whatever
    /// `empty_init` is. The previous generation keeps being served.
    pub fn reload(&self) -> Result<u64> {
        let observed = self.generation();
        let _guard = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(current) = self.current.load_full() {
            if observed != Some(current.number) {
                tracing::debug!(generation = current.number, "Reload coalesced with a concurrent one");
                return Ok(current.number);
            }
        }

        let number = observed.map_or(0, |n| n + 1);
        let built = self
            .read_source(true)
            .and_then(|raw| raw.ok_or_else(|| self.source_not_found()))
            .and_then(|raw| self.build_generation(raw, number));
        match built {
            Ok(generation) => {
                self.current.store(Some(Arc::new(generation)));
                crate::log_generation_published!(number, self.describe_source());
                Ok(number)
            }
            Err(e) => {
                crate::log_reload_failed!(observed, &e);
                Err(e)
            }
        }
    }

    fn ensure_loaded(&self, empty_init: bool) -> Result<Option<Arc<Generation>>> {
        if let Some(generation) = self.current.load_full() {
            return Ok(Some(generation));
        }

        let _guard = self.reload_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(generation) = self.current.load_full() {
            return Ok(Some(generation));
        }

        let raw = match self.read_source(false)? {
            Some(raw) => raw,
            None if empty_init => {
                tracing::debug!(source = %self.describe_source(), "No configuration source, serving an empty tree");
                return Ok(None);
            }
            None => return Err(self.source_not_found()),
        };

        let generation = Arc::new(self.build_generation(raw, 0)?);
        self.current.store(Some(Arc::clone(&generation)));
        crate::log_generation_published!(0u64, self.describe_source());
        Ok(Some(generation))
    }

    /// Parsed source, `None` when the file does not exist
    fn read_source(&self, reload: bool) -> Result<Option<Arc<RawMapping>>> {
        match &self.reader {
            SourceReader::Mapping(mapping) => Ok(Some(Arc::clone(mapping))),
            SourceReader::File(loader) if reload => loader.reload(parse_config_file),
            SourceReader::File(loader) => loader.get(parse_config_file),
        }
    }

    fn source_not_found(&self) -> ConfError {
        match &self.reader {
            SourceReader::Mapping(_) => ConfError::ConfigNotFound("mapping".to_string()),
            SourceReader::File(loader) => ConfError::ConfigNotFound(format!(
                "{} (set {} or pass a path)",
                loader.path().display(),
                loader.locator().env().active_name()
            )),
        }
    }

    fn unloaded_crypt(&self) -> Arc<dyn CryptAdapter> {
        match &self.crypt {
            Some(crypt) => Arc::clone(crypt),
            None => Arc::new(NoOpCrypt),
        }
    }

    fn build_generation(&self, raw: Arc<RawMapping>, number: u64) -> Result<Generation> {
        let crypt = match &self.crypt {
            Some(crypt) => Arc::clone(crypt),
            None => self.crypt_from_source(&raw)?,
        };

        let root = ConfigTree::from_mapping(&raw, false, Arc::clone(&crypt))?;
        if let Some(rules) = &self.rules {
            rules.check(&root)?;
        }

        Ok(Generation {
            number,
            raw,
            root: Arc::new(root),
            crypt,
            memo: RwLock::new(HashMap::new()),
        })
    }

    /// Adapter described by `<root>.crypt`; identity when the block is absent
    fn crypt_from_source(&self, raw: &RawMapping) -> Result<Arc<dyn CryptAdapter>> {
        let root_name = self
            .rules
            .as_ref()
            .map_or(DEFAULT_ROOT_NAMESPACE, StructureRules::root);

        let block = find_normalized(raw, root_name)
            .and_then(|root| root.as_object())
            .and_then(|root| find_normalized(root, "crypt"));

        let config = match block {
            Some(block) => serde_json::from_value::<CryptConfig>(normalize_keys(block))
                .map_err(|e| ConfError::Configuration(format!("Invalid {root_name}.crypt block: {e}")))?,
            None => CryptConfig::default(),
        };
        crypt_from_config(&config, self.key_file.clone())
    }

    fn describe_source(&self) -> String {
        match self.source_path() {
            Some(path) => path.display().to_string(),
            None => "mapping".to_string(),
        }
    }
}

fn subtree(root: &ConfigTree, namespace: &str, empty_init: bool) -> Result<ConfigTree> {
    match root.get_tree(namespace) {
        Ok(tree) => Ok(tree),
        Err(ConfError::AttrNotFound { .. }) if empty_init => Ok(ConfigTree::empty_with_crypt(
            true,
            Arc::clone(root.crypt()),
        )),
        Err(ConfError::ConfigStructureInvalid(_)) => Err(ConfError::ConfigStructureInvalid(
            format!("namespace `{namespace}` resolves to a value, not a block"),
        )),
        Err(other) => Err(other),
    }
}

fn find_normalized<'a>(
    map: &'a RawMapping,
    key: &str,
) -> Option<&'a serde_json::Value> {
    map.iter()
        .find(|(k, _)| normalize_key(k) == key)
        .map(|(_, v)| v)
}

fn normalize_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (normalize_key(k), normalize_keys(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

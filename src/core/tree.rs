//! Normalized, decryption-resolved configuration tree
//!
//! A [`ConfigTree`] is built once from a raw parsed mapping and never changes
//! afterwards. Construction applies, for every key of every block:
//!
//! 1. `-` is replaced by `_`;
//! 2. nested mappings become child trees sharing the same settings;
//! 3. keys matching `enc_<name>` (any case) are decrypted with the tree's
//!    [`CryptAdapter`] and exposed as `<name>`; the `enc_` entry itself is
//!    never exposed;
//! 4. everything else is stored as parsed.
//!
//! Lookups use dotted paths (`"pyms.config.app_name"`). When a tree was
//! built with `empty_init`, a missing path yields a fresh empty tree instead
//! of [`ConfError::AttrNotFound`].

use super::value::Value;
use crate::adapters::crypt::{CryptAdapter, NoOpCrypt};
use crate::config::loader::RawMapping;
use crate::domain::errors::{ConfError, CryptError};
use crate::domain::result::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

const ENCRYPTED_PREFIX: &str = "enc_";

/// Replaces characters that cannot appear in an attribute-style key
pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
}

/// Returns the exposed name of an encrypted key, or `None` for plain keys
fn encrypted_name(key: &str) -> Option<&str> {
    let prefix = key.get(..ENCRYPTED_PREFIX.len())?;
    let name = &key[ENCRYPTED_PREFIX.len()..];
    (prefix.eq_ignore_ascii_case(ENCRYPTED_PREFIX) && !name.is_empty()).then_some(name)
}

/// Immutable configuration tree
#[derive(Clone)]
pub struct ConfigTree {
    entries: BTreeMap<String, Value>,
    empty_init: bool,
    crypt: Arc<dyn CryptAdapter>,
}

impl ConfigTree {
    /// Creates a tree with no keys and the identity adapter
    pub fn empty(empty_init: bool) -> Self {
        Self::empty_with_crypt(empty_init, Arc::new(NoOpCrypt))
    }

    /// Creates a tree with no keys sharing an existing adapter
    pub fn empty_with_crypt(empty_init: bool, crypt: Arc<dyn CryptAdapter>) -> Self {
        Self {
            entries: BTreeMap::new(),
            empty_init,
            crypt,
        }
    }

    /// Builds a tree from a raw mapping
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::Decrypt`] naming the field when an `enc_` value
    /// cannot be decrypted. No partially built tree is returned.
    pub fn from_mapping(
        raw: &RawMapping,
        empty_init: bool,
        crypt: Arc<dyn CryptAdapter>,
    ) -> Result<Self> {
        Self::build(raw, empty_init, &crypt, "")
    }

    fn build(
        raw: &RawMapping,
        empty_init: bool,
        crypt: &Arc<dyn CryptAdapter>,
        prefix: &str,
    ) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let mut encrypted = Vec::new();

        for (raw_key, raw_value) in raw {
            let key = normalize_key(raw_key);
            if let Some(name) = encrypted_name(&key) {
                encrypted.push((name.to_string(), raw_key, raw_value));
                continue;
            }

            let value = match raw_value {
                serde_json::Value::Object(child) => Value::Tree(Self::build(
                    child,
                    empty_init,
                    crypt,
                    &join_path(prefix, &key),
                )?),
                other => Value::Scalar(other.clone()),
            };
            if entries.insert(key.clone(), value).is_some() {
                tracing::warn!(
                    key = %join_path(prefix, &key),
                    "Duplicate key after normalization, keeping the last one"
                );
            }
        }

        // Decrypted entries go last so they win over a plain key with the same name.
        for (name, raw_key, raw_value) in encrypted {
            let field = join_path(prefix, raw_key);
            let ciphertext = raw_value.as_str().ok_or_else(|| ConfError::Decrypt {
                field: field.clone(),
                source: CryptError::DecryptFailure(
                    "encrypted field must hold a string".to_string(),
                ),
            })?;

            let plaintext = crypt
                .decrypt(ciphertext)
                .map_err(|source| ConfError::Decrypt {
                    field: field.clone(),
                    source,
                })?;
            tracing::debug!(field = %field, adapter = crypt.name(), "Encrypted field resolved");

            if entries
                .insert(name, Value::Scalar(serde_json::Value::String(plaintext)))
                .is_some()
            {
                tracing::warn!(
                    field = %field,
                    "Encrypted field shadows a plain key with the same name"
                );
            }
        }

        Ok(Self {
            entries,
            empty_init,
            crypt: Arc::clone(crypt),
        })
    }

    /// Looks up a dotted path
    ///
    /// An empty path returns the tree itself.
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::AttrNotFound`] for a missing path unless the
    /// tree was built with `empty_init`, in which case a fresh empty tree is
    /// returned.
    pub fn get(&self, path: &str) -> Result<Value> {
        if path.is_empty() {
            return Ok(Value::Tree(self.clone()));
        }

        match self.walk(path) {
            Ok(value) => Ok(value.clone()),
            Err(_) if self.empty_init => Ok(Value::Tree(Self::empty_with_crypt(
                true,
                Arc::clone(&self.crypt),
            ))),
            Err(missing) => Err(ConfError::AttrNotFound {
                path: path.to_string(),
                missing,
            }),
        }
    }

    /// Borrows the value at a dotted path, if present
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        self.walk(path).ok()
    }

    /// Whether a dotted path exists
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Walks the path; on a miss returns the prefix up to the first missing hop
    fn walk(&self, path: &str) -> std::result::Result<&Value, String> {
        let normalized = normalize_key(path);
        let mut hops = normalized.split('.');
        let mut walked = String::new();

        let first = hops.next().unwrap_or_default();
        walked.push_str(first);
        let mut current = self.entries.get(first).ok_or_else(|| walked.clone())?;

        for hop in hops {
            walked.push('.');
            walked.push_str(hop);
            current = match current {
                Value::Tree(tree) => tree.entries.get(hop).ok_or_else(|| walked.clone())?,
                Value::Scalar(_) => return Err(walked),
            };
        }
        Ok(current)
    }

    /// Returns the block at a dotted path
    ///
    /// # Errors
    ///
    /// Same as [`ConfigTree::get`], plus [`ConfError::ConfigStructureInvalid`]
    /// when the path holds a leaf.
    pub fn get_tree(&self, path: &str) -> Result<ConfigTree> {
        match self.get(path)? {
            Value::Tree(tree) => Ok(tree),
            Value::Scalar(_) => Err(ConfError::ConfigStructureInvalid(format!(
                "`{path}` is a value, not a block"
            ))),
        }
    }

    /// Returns the string at a dotted path
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::AttrNotFound`] if missing and
    /// [`ConfError::Configuration`] if the value is not a string.
    pub fn get_str(&self, path: &str) -> Result<String> {
        let value = self.require(path)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| type_mismatch(path, "a string"))
    }

    /// Returns the boolean at a dotted path
    ///
    /// # Errors
    ///
    /// Same as [`ConfigTree::get_str`].
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        self.require(path)?
            .as_bool()
            .ok_or_else(|| type_mismatch(path, "a boolean"))
    }

    /// Returns the integer at a dotted path
    ///
    /// # Errors
    ///
    /// Same as [`ConfigTree::get_str`].
    pub fn get_i64(&self, path: &str) -> Result<i64> {
        self.require(path)?
            .as_i64()
            .ok_or_else(|| type_mismatch(path, "an integer"))
    }

    // Typed accessors never turn a miss into an empty tree.
    fn require(&self, path: &str) -> Result<&Value> {
        self.walk(path).map_err(|missing| ConfError::AttrNotFound {
            path: path.to_string(),
            missing,
        })
    }

    /// Top-level keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Top-level entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether missing lookups yield empty trees
    pub fn empty_init(&self) -> bool {
        self.empty_init
    }

    /// Adapter that resolved this tree's encrypted fields
    pub fn crypt(&self) -> &Arc<dyn CryptAdapter> {
        &self.crypt
    }

    /// Copy of this tree with `empty_init` changed at every depth
    pub fn with_empty_init(&self, empty_init: bool) -> ConfigTree {
        let entries = self
            .entries
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::Tree(tree) => Value::Tree(tree.with_empty_init(empty_init)),
                    scalar => scalar.clone(),
                };
                (k.clone(), v)
            })
            .collect();
        Self {
            entries,
            empty_init,
            crypt: Arc::clone(&self.crypt),
        }
    }

    /// Single-level view with upper-cased top-level keys
    ///
    /// Children are kept as they are.
    pub fn to_flat_uppercase(&self) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .map(|(k, v)| (k.to_uppercase(), v.clone()))
            .collect()
    }

    /// JSON rendering of the exposed mapping
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn type_mismatch(path: &str, expected: &str) -> ConfError {
    ConfError::Configuration(format!("`{path}` is not {expected}"))
}

impl PartialEq for ConfigTree {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl PartialEq<serde_json::Value> for ConfigTree {
    fn eq(&self, other: &serde_json::Value) -> bool {
        match other {
            serde_json::Value::Object(map) => {
                map.len() == self.entries.len()
                    && map
                        .iter()
                        .all(|(k, v)| self.entries.get(k).is_some_and(|mine| mine == v))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigTree")
            .field("entries", &self.entries)
            .field("empty_init", &self.empty_init)
            .field("crypt", &self.crypt.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::CryptError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Decrypts by stripping a `cipher:` marker; counts calls.
    #[derive(Default)]
    struct MarkerCrypt {
        calls: AtomicUsize,
    }

    impl CryptAdapter for MarkerCrypt {
        fn name(&self) -> &'static str {
            "marker"
        }

        fn encrypt(&self, plaintext: &str) -> std::result::Result<String, CryptError> {
            Ok(format!("cipher:{plaintext}"))
        }

        fn decrypt(&self, ciphertext: &str) -> std::result::Result<String, CryptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ciphertext
                .strip_prefix("cipher:")
                .map(str::to_string)
                .ok_or_else(|| CryptError::DecryptFailure("missing marker".to_string()))
        }
    }

    fn raw(value: serde_json::Value) -> RawMapping {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    fn tree(value: serde_json::Value) -> ConfigTree {
        ConfigTree::from_mapping(&raw(value), false, Arc::new(NoOpCrypt)).unwrap()
    }

    #[test]
    fn test_hyphenated_keys_are_normalized() {
        let config = tree(json!({"test-1": "a", "test_2": "b"}));
        assert_eq!(config.get("test_1").unwrap(), "a");
        assert_eq!(config.get("test_2").unwrap(), "b");
        assert_eq!(config.keys().collect::<Vec<_>>(), vec!["test_1", "test_2"]);
    }

    #[test]
    fn test_hyphenated_keys_at_depth() {
        let config = tree(json!({"test-1": {"test-1-1": "a", "test_1-2": {"deep-key": "c"}}}));
        assert_eq!(config.get("test_1.test_1_1").unwrap(), "a");
        assert_eq!(config.get("test_1.test_1_2.deep_key").unwrap(), "c");
        // Requested paths are normalized the same way.
        assert_eq!(config.get("test-1.test-1-2.deep-key").unwrap(), "c");
    }

    #[test]
    fn test_dotted_lookup_returns_subtree() {
        let config = tree(json!({"pyms": {"config": {"app_name": "demo"}}}));
        let pyms = config.get_tree("pyms").unwrap();
        assert_eq!(pyms.get("config.app_name").unwrap(), "demo");
        assert_eq!(config.get_str("pyms.config.app_name").unwrap(), "demo");
    }

    #[test]
    fn test_empty_path_returns_self() {
        let config = tree(json!({"a": 1}));
        assert_eq!(config.get("").unwrap(), Value::Tree(config.clone()));
    }

    #[test]
    fn test_missing_path_without_empty_init() {
        let config = tree(json!({"a": {"x": 1}}));
        let err = config.get("a.b.c").unwrap_err();
        match err {
            ConfError::AttrNotFound { path, missing } => {
                assert_eq!(path, "a.b.c");
                assert_eq!(missing, "a.b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_path_through_scalar_is_missing() {
        let config = tree(json!({"a": "leaf"}));
        assert!(matches!(
            config.get("a.b"),
            Err(ConfError::AttrNotFound { .. })
        ));
    }

    #[test]
    fn test_empty_init_yields_empty_trees_at_any_depth() {
        let config = ConfigTree::from_mapping(&raw(json!({"a": {"b": 1}})), true, Arc::new(NoOpCrypt))
            .unwrap();

        for path in ["my_ms", "my_ms.level_two", "a.b.c.d", "a.x.y.z.w"] {
            let value = config.get(path).unwrap();
            assert!(value.is_empty_tree(), "{path} should be an empty tree");
        }

        let fresh = config.get("nope").unwrap().into_tree().unwrap();
        assert!(fresh.empty_init());
        assert!(fresh.get("still.nothing").unwrap().is_empty_tree());
    }

    #[test]
    fn test_empty_init_inherited_by_children() {
        let config = ConfigTree::from_mapping(&raw(json!({"a": {"b": {"c": 1}}})), true, Arc::new(NoOpCrypt))
            .unwrap();
        let b = config.get_tree("a.b").unwrap();
        assert!(b.empty_init());
        assert!(b.get("missing").unwrap().is_empty_tree());
    }

    #[test]
    fn test_typed_accessors_ignore_empty_init() {
        let config = ConfigTree::from_mapping(&raw(json!({"port": 8080, "debug": true})), true, Arc::new(NoOpCrypt))
            .unwrap();
        assert_eq!(config.get_i64("port").unwrap(), 8080);
        assert!(config.get_bool("debug").unwrap());
        assert!(matches!(
            config.get_str("missing"),
            Err(ConfError::AttrNotFound { .. })
        ));
        assert!(matches!(
            config.get_str("port"),
            Err(ConfError::Configuration(_))
        ));
    }

    #[test]
    fn test_encrypted_field_is_decrypted_and_hidden() {
        let crypt = Arc::new(MarkerCrypt::default());
        let config = ConfigTree::from_mapping(
            &raw(json!({"enc_database_url": "cipher:http://db"})),
            false,
            crypt.clone(),
        )
        .unwrap();

        assert_eq!(config.get("database_url").unwrap(), "http://db");
        assert!(!config.contains("enc_database_url"));
        assert_eq!(config.keys().collect::<Vec<_>>(), vec!["database_url"]);
        assert_eq!(crypt.calls.load(Ordering::SeqCst), 1);

        // Lookups never decrypt again.
        config.get("database_url").unwrap();
        let _ = config.clone();
        assert_eq!(crypt.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_encrypted_prefix_is_case_insensitive() {
        let config = ConfigTree::from_mapping(
            &raw(json!({"config": {"ENC_SQLALCHEMY_DATABASE_URI": "cipher:http://db", "Enc-Token": "cipher:t"}})),
            false,
            Arc::new(MarkerCrypt::default()),
        )
        .unwrap();

        assert_eq!(config.get("config.SQLALCHEMY_DATABASE_URI").unwrap(), "http://db");
        assert_eq!(config.get("config.Token").unwrap(), "t");
        assert!(!config.contains("config.ENC_SQLALCHEMY_DATABASE_URI"));
    }

    #[test]
    fn test_bare_prefix_is_a_plain_key() {
        let config = ConfigTree::from_mapping(
            &raw(json!({"enc_": "value"})),
            false,
            Arc::new(MarkerCrypt::default()),
        )
        .unwrap();
        assert_eq!(config.get("enc_").unwrap(), "value");
    }

    #[test]
    fn test_decrypted_value_wins_over_plain_key() {
        let config = ConfigTree::from_mapping(
            &raw(json!({"password": "plain", "enc_password": "cipher:secret"})),
            false,
            Arc::new(MarkerCrypt::default()),
        )
        .unwrap();
        assert_eq!(config.get("password").unwrap(), "secret");
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_decrypt_failure_names_field() {
        let err = ConfigTree::from_mapping(
            &raw(json!({"db": {"enc_url": "garbage"}})),
            false,
            Arc::new(MarkerCrypt::default()),
        )
        .unwrap_err();

        match err {
            ConfError::Decrypt { field, source } => {
                assert_eq!(field, "db.enc_url");
                assert!(matches!(source, CryptError::DecryptFailure(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_string_encrypted_value_fails() {
        let err = ConfigTree::from_mapping(
            &raw(json!({"enc_port": 5432})),
            false,
            Arc::new(MarkerCrypt::default()),
        )
        .unwrap_err();
        assert!(matches!(
            err.crypt_error(),
            Some(CryptError::DecryptFailure(_))
        ));
    }

    #[test]
    fn test_equality_is_structural() {
        let config1 = tree(json!({"test-1": {"test-1-1": "a", "test_1-2": "b"}}));
        let config2 = tree(json!({"test-1": {"test-1-1": "a", "test_1-2": "b"}}));
        let config3 = tree(json!({"test-1": {"test-1-1": "a", "test_1-2": "b"}, "test_2": "c"}));

        assert_eq!(config1, config2);
        assert_ne!(config1, config3);

        let flagged = config1.with_empty_init(true);
        assert_eq!(config1, flagged);
    }

    #[test]
    fn test_equality_against_json() {
        let config = tree(json!({"test-1": {"test-1-1": "a", "test_1-2": "b"}}));
        assert_eq!(config, json!({"test_1": {"test_1_1": "a", "test_1_2": "b"}}));
        assert_ne!(config, json!({"test-1": {"test-1-1": "a", "test-1-2": "b"}}));
        assert_ne!(config, json!("not a mapping"));
    }

    #[test]
    fn test_equality_ignores_adapter() {
        let plain = tree(json!({"database_url": "http://db"}));
        let decrypted = ConfigTree::from_mapping(
            &raw(json!({"enc_database_url": "cipher:http://db"})),
            false,
            Arc::new(MarkerCrypt::default()),
        )
        .unwrap();
        assert_eq!(plain, decrypted);
    }

    #[test]
    fn test_flat_uppercase_view() {
        let config = tree(json!({"app_name": "demo", "subservice1": {"test": "input"}}));
        let flat = config.to_flat_uppercase();

        assert_eq!(flat["APP_NAME"], "demo");
        let sub = flat["SUBSERVICE1"].as_tree().unwrap();
        assert_eq!(sub.get("test").unwrap(), "input");
        assert!(!flat.contains_key("app_name"));
    }

    #[test]
    fn test_with_empty_init_reflags_every_depth() {
        let config = tree(json!({"a": {"b": {"c": 1}}}));
        let relaxed = config.with_empty_init(true);
        assert!(relaxed.get_tree("a.b").unwrap().empty_init());
        assert!(relaxed.get("a.b.missing").unwrap().is_empty_tree());
        assert!(config.get("a.b.missing").is_err());
    }

    #[test]
    fn test_lists_are_kept_as_leaves() {
        let config = tree(json!({"hosts": ["a", "b"], "nested": {"ports": [1, 2]}}));
        assert_eq!(config.get("hosts").unwrap(), json!(["a", "b"]));
        assert_eq!(config.get("nested.ports").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_to_json_round_trips_exposed_mapping() {
        let config = tree(json!({"a-b": {"c": null, "d": 1.5}}));
        assert_eq!(config.to_json(), json!({"a_b": {"c": null, "d": 1.5}}));
    }
}

//! Root-level structure rules
//!
//! Services keep their whole configuration under one root block:
//!
//! ```yaml
//! pyms:
//!   services:
//!     metrics: true
//!   config:
//!     DEBUG: true
//! ```
//!
//! [`StructureRules`] checks that the root block exists, that required child
//! blocks are present and, optionally, that the root block holds nothing but
//! known keywords.

use super::tree::ConfigTree;
use crate::config::env::DEFAULT_ROOT_NAMESPACE;
use crate::domain::errors::ConfError;
use crate::domain::result::Result;

/// Keywords accepted directly under the root block by default
pub const DEFAULT_ROOT_KEYWORDS: [&str; 3] = ["config", "services", "crypt"];

const EXAMPLE: &str = "pyms:
  services:
    metrics: true
    requests:
      data: data
  config:
    DEBUG: true
    TESTING: true";

/// Structural rules checked before a configuration is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureRules {
    root: String,
    required_blocks: Vec<String>,
    allowed_keywords: Option<Vec<String>>,
}

impl StructureRules {
    /// Rules requiring only the given root block
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            required_blocks: Vec::new(),
            allowed_keywords: None,
        }
    }

    /// Requires a child block under the root
    pub fn require_block(mut self, block: impl Into<String>) -> Self {
        self.required_blocks.push(block.into());
        self
    }

    /// Restricts the keys allowed directly under the root
    pub fn allow_only<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// Root block these rules apply to
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Checks a built tree
    ///
    /// # Errors
    ///
    /// Returns [`ConfError::ConfigStructureInvalid`] describing the first
    /// violated rule.
    pub fn check(&self, tree: &ConfigTree) -> Result<()> {
        let root = match tree.lookup(&self.root).and_then(|v| v.as_tree()) {
            Some(root) => root,
            None => {
                return Err(ConfError::ConfigStructureInvalid(format!(
                    "Config file must start with `{}` keyword, for example:\n{}",
                    self.root, EXAMPLE
                )))
            }
        };

        for block in &self.required_blocks {
            if !root.contains(block) {
                return Err(ConfError::ConfigStructureInvalid(format!(
                    "`{}` block must contain a `{}` keyword, for example:\n{}",
                    self.root, block, EXAMPLE
                )));
            }
        }

        if let Some(allowed) = &self.allowed_keywords {
            let wrong: Vec<&str> = root
                .keys()
                .filter(|k| !allowed.iter().any(|a| a.as_str() == *k))
                .collect();
            if !wrong.is_empty() {
                return Err(ConfError::ConfigStructureInvalid(format!(
                    "{:?} isn't a valid keyword for `{}` block, allowed: {}",
                    wrong,
                    self.root,
                    allowed.join(", ")
                )));
            }
        }

        Ok(())
    }
}

impl Default for StructureRules {
    /// `pyms` root with a required `config` block and the default keywords
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_NAMESPACE)
            .require_block("config")
            .allow_only(DEFAULT_ROOT_KEYWORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::crypt::NoOpCrypt;
    use serde_json::json;
    use std::sync::Arc;

    fn tree(value: serde_json::Value) -> ConfigTree {
        let serde_json::Value::Object(map) = value else {
            panic!("fixture must be an object");
        };
        ConfigTree::from_mapping(&map, false, Arc::new(NoOpCrypt)).unwrap()
    }

    #[test]
    fn test_valid_structure() {
        let config = tree(json!({
            "pyms": {"services": {"metrics": true}, "config": {"DEBUG": true}}
        }));
        assert!(StructureRules::default().check(&config).is_ok());
    }

    #[test]
    fn test_missing_root() {
        let config = tree(json!({"my_ms": {"config": {}}}));
        let err = StructureRules::default().check(&config).unwrap_err();
        assert!(matches!(err, ConfError::ConfigStructureInvalid(_)));
        assert!(err.to_string().contains("must start with `pyms`"));
    }

    #[test]
    fn test_root_must_be_a_block() {
        let config = tree(json!({"pyms": "flat"}));
        assert!(StructureRules::default().check(&config).is_err());
    }

    #[test]
    fn test_missing_config_block() {
        let config = tree(json!({"pyms": {"services": {}}}));
        let err = StructureRules::default().check(&config).unwrap_err();
        assert!(err.to_string().contains("must contain a `config` keyword"));
    }

    #[test]
    fn test_unknown_keyword() {
        let config = tree(json!({"pyms": {"config": {}, "metrics": true}}));
        let err = StructureRules::default().check(&config).unwrap_err();
        assert!(err.to_string().contains("metrics"));
    }

    #[test]
    fn test_custom_rules() {
        let rules = StructureRules::new("app");
        let config = tree(json!({"app": {"anything": 1}}));
        assert!(rules.check(&config).is_ok());
        assert_eq!(rules.root(), "app");
    }
}

//! Values stored in a [`ConfigTree`]

use super::tree::ConfigTree;

/// A configuration value: a leaf or a child tree
///
/// Leaves keep their parsed JSON form (strings, numbers, booleans, null and
/// lists). Mappings are always [`Value::Tree`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Leaf value; never a JSON object
    Scalar(serde_json::Value),
    /// Nested block
    Tree(ConfigTree),
}

impl Value {
    /// String content of a string leaf
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(v) => v.as_str(),
            Value::Tree(_) => None,
        }
    }

    /// Boolean content of a boolean leaf
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Scalar(v) => v.as_bool(),
            Value::Tree(_) => None,
        }
    }

    /// Integer content of an integer leaf
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Scalar(v) => v.as_i64(),
            Value::Tree(_) => None,
        }
    }

    /// Numeric content of a number leaf
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => v.as_f64(),
            Value::Tree(_) => None,
        }
    }

    /// Child tree, if this is a block
    pub fn as_tree(&self) -> Option<&ConfigTree> {
        match self {
            Value::Tree(tree) => Some(tree),
            Value::Scalar(_) => None,
        }
    }

    /// Takes the child tree out, if this is a block
    pub fn into_tree(self) -> Option<ConfigTree> {
        match self {
            Value::Tree(tree) => Some(tree),
            Value::Scalar(_) => None,
        }
    }

    /// Whether this is a block with no keys
    pub fn is_empty_tree(&self) -> bool {
        matches!(self, Value::Tree(tree) if tree.is_empty())
    }

    /// JSON rendering of the exposed value
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Scalar(v) => v.clone(),
            Value::Tree(tree) => tree.to_json(),
        }
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<serde_json::Value> for Value {
    fn eq(&self, other: &serde_json::Value) -> bool {
        match self {
            Value::Scalar(v) => v == other,
            Value::Tree(tree) => tree == other,
        }
    }
}

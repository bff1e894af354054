//! Path-carrying errors shared by every loadable.
//!
//! Text conversion appends one segment per nested call, so an error deep in
//! a config reports a breadcrumb such as `items[2].scale`. Binary decoding
//! has no source document and reports an empty path.

use serde_json::Value;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A conversion, serialization, or decoding failure at a field path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}{kind}", path_prefix(.path))]
pub struct LoadError {
    /// Dotted/bracketed path of the offending node. Empty for the root and
    /// for binary errors.
    pub path: String,
    pub kind: LoadErrorKind,
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadErrorKind {
    #[error("missing required key")]
    Missing,
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("value {value} outside range [{min}, {max}]")]
    OutOfRange {
        value: String,
        min: String,
        max: String,
    },
    #[error("unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },
    #[error("unknown type key '{0}'")]
    UnknownTypeKey(String),
    #[error("expected at least {min} elements, found {found}")]
    TooFew { min: usize, found: usize },
    #[error("{0}")]
    Custom(String),
    #[error("malformed binary data: {0}")]
    Decode(String),
}

fn path_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{path}: ")
    }
}

impl LoadError {
    pub fn new(path: impl Into<String>, kind: LoadErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        Self::new(path, LoadErrorKind::Missing)
    }

    /// The node has the wrong JSON shape.
    pub fn wrong_type(path: impl Into<String>, expected: &'static str, found: &Value) -> Self {
        Self::new(
            path,
            LoadErrorKind::WrongType {
                expected,
                found: json_type_name(found),
            },
        )
    }

    pub fn unknown_name(path: impl Into<String>, kind: &'static str, name: impl Into<String>) -> Self {
        Self::new(
            path,
            LoadErrorKind::UnknownName {
                kind,
                name: name.into(),
            },
        )
    }

    pub fn custom(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(path, LoadErrorKind::Custom(message.into()))
    }

    /// A binary decoding failure. Binary input carries no path.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(String::new(), LoadErrorKind::Decode(message.into()))
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Append an object key segment: `parent.key`, or `key` at the root.
pub fn key_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// Append an array index segment: `parent[index]`.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Short name of a JSON node's shape, for error messages.
pub fn json_type_name(node: &Value) -> &'static str {
    match node {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ===========================================================================
// Tests
// ===========================================================================

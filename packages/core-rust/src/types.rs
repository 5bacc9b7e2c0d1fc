use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime value type for params, envelope data and meta entries.
///
/// JSON-compatible by construction: the envelope is a JSON document and the
/// params bag arrives as decoded JSON or as a flat query/form map.
pub type Value = serde_json::Value;

/// Raw params bag of a call. Insertion-ordered (`preserve_order`).
pub type Params = serde_json::Map<String, Value>;

/// Endpoint scope: whole collection (no id) or a single member (id required).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Collection,
    Member,
}

impl Scope {
    /// Scope implied by the presence of a call id.
    #[must_use]
    pub const fn for_id(has_id: bool) -> Self {
        if has_id {
            Self::Member
        } else {
            Self::Collection
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbolic or numeric error code carried by controlled errors and rendered
/// in `error.code` of the envelope.
///
/// Serializes untagged: numbers stay JSON numbers, symbols become strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Symbol(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Symbol(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ErrorCode {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for ErrorCode {
    fn from(n: i32) -> Self {
        Self::Number(i64::from(n))
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        Self::Symbol(s.to_string())
    }
}

impl From<String> for ErrorCode {
    fn from(s: String) -> Self {
        Self::Symbol(s)
    }
}

/// Renders a value the way a form field would carry it: strings verbatim,
/// scalars in their JSON text form, null as the empty string.
#[must_use]
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether a raw param value counts as "not given": absent, null, or an
/// empty string. Empty arrays and maps are values.
#[must_use]
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

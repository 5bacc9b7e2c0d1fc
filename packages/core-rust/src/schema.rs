//! Params schema: ordered field declarations with a type tag and options.
//!
//! Schemas are declared through [`SchemaBuilder`]:
//!
//! ```
//! use joshua_core::schema::{ParamType, SchemaBuilder};
//!
//! let mut s = SchemaBuilder::new();
//! s.field("user_id", ParamType::Integer);
//! s.field("country_id?", "integer").min(1);
//! s.flag("is_active", false);
//! let schema = s.finish().unwrap();
//!
//! assert!(schema.get("user_id").unwrap().opts.required);
//! assert!(!schema.get("country_id").unwrap().opts.required);
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::types::Value;

// ---------------------------------------------------------------------------
// ParamType
// ---------------------------------------------------------------------------

/// Type tag of a declared param.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    Boolean,
    Integer,
    Float,
    String,
    Date,
    DateTime,
    Hash,
    Email,
    Url,
    Point,
    Oib,
    /// Nested schema registered under the given name.
    Model(String),
    /// User-registered checker under the given name.
    Custom(String),
}

impl ParamType {
    /// Canonical tag, as used in exported metadata.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::Hash => "hash",
            Self::Email => "email",
            Self::Url => "url",
            Self::Point => "point",
            Self::Oib => "oib",
            Self::Model(_) => "model",
            Self::Custom(name) => name,
        }
    }

    #[must_use]
    pub fn model(name: impl Into<String>) -> Self {
        Self::Model(name.into())
    }
}

/// Normalises `DateTime`, `date-time` and `date_time` to the same tag.
fn normalize_tag(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    for (i, ch) in raw.trim().chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else if ch == '-' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }
    out
}

impl FromStr for ParamType {
    type Err = Infallible;

    /// Unknown tags become [`ParamType::Custom`]; `model:<name>` selects a
    /// nested model.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if let Some(name) = raw.trim().strip_prefix("model:") {
            return Ok(Self::Model(name.to_string()));
        }
        let tag = normalize_tag(raw);
        Ok(match tag.as_str() {
            "boolean" | "bool" => Self::Boolean,
            "integer" | "int" => Self::Integer,
            "float" => Self::Float,
            "string" => Self::String,
            "date" => Self::Date,
            "date_time" | "datetime" => Self::DateTime,
            "hash" => Self::Hash,
            "email" => Self::Email,
            "url" => Self::Url,
            "point" => Self::Point,
            "oib" => Self::Oib,
            _ => Self::Custom(tag),
        })
    }
}

impl From<&str> for ParamType {
    fn from(raw: &str) -> Self {
        match raw.parse() {
            Ok(ty) => ty,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(name) => write!(f, "model:{name}"),
            other => f.write_str(other.tag()),
        }
    }
}

impl Serialize for ParamType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// ParamOpts
// ---------------------------------------------------------------------------

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

/// Per-field options. Setters chain on `&mut Self`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamOpts {
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "is_false")]
    pub array: bool,
    /// Literal split delimiter for array values; `None` splits on `,`, `:`
    /// or `;` with surrounding whitespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub no_duplicates: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    /// Key allow-list for `hash` params.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl Default for ParamOpts {
    fn default() -> Self {
        Self {
            required: true,
            default: None,
            array: false,
            delimiter: None,
            no_duplicates: false,
            values: None,
            min: None,
            max: None,
            round: None,
            allow: None,
            desc: None,
        }
    }
}

impl ParamOpts {
    pub fn required(&mut self) -> &mut Self {
        self.required = true;
        self
    }

    pub fn optional(&mut self) -> &mut Self {
        self.required = false;
        self
    }

    /// Value used when the raw param is blank.
    pub fn default_to(&mut self, value: impl Into<Value>) -> &mut Self {
        self.default = Some(value.into());
        self
    }

    pub fn array(&mut self) -> &mut Self {
        self.array = true;
        self
    }

    /// Splits array input on `delimiter` instead of the default separators.
    pub fn delimiter(&mut self, delimiter: impl Into<String>) -> &mut Self {
        self.array = true;
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn no_duplicates(&mut self) -> &mut Self {
        self.array = true;
        self.no_duplicates = true;
        self
    }

    pub fn values<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn min(&mut self, min: impl Into<Value>) -> &mut Self {
        self.min = Some(min.into());
        self
    }

    pub fn max(&mut self, max: impl Into<Value>) -> &mut Self {
        self.max = Some(max.into());
        self
    }

    pub fn round(&mut self, places: u32) -> &mut Self {
        self.round = Some(places);
        self
    }

    pub fn allow<I, K>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.allow = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn desc(&mut self, text: impl Into<String>) -> &mut Self {
        self.desc = Some(text.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ParamSchema
// ---------------------------------------------------------------------------

/// A declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamField {
    pub name: String,
    pub ty: ParamType,
    pub opts: ParamOpts,
}

/// Ordered field declarations. Validation walks fields in this order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamSchema {
    fields: Vec<ParamField>,
}

impl ParamSchema {
    #[must_use]
    pub fn fields(&self) -> &[ParamField] {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamField> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every type tag referenced by the schema, in field order.
    pub fn types(&self) -> impl Iterator<Item = &ParamType> {
        self.fields.iter().map(|f| &f.ty)
    }
}

/// Exported as `{name: {"type": tag, ..opts}}`.
impl Serialize for ParamSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            #[serde(rename = "type")]
            ty: &'a ParamType,
            #[serde(skip_serializing_if = "Option::is_none")]
            model: Option<&'a str>,
            #[serde(flatten)]
            opts: &'a ParamOpts,
        }

        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            let model = match &field.ty {
                ParamType::Model(name) => Some(name.as_str()),
                _ => None,
            };
            map.serialize_entry(
                &field.name,
                &Entry {
                    ty: &field.ty,
                    model,
                    opts: &field.opts,
                },
            )?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// SchemaBuilder
// ---------------------------------------------------------------------------

/// Declaration errors found while building a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("param \"{0}\": use a trailing \"?\" or optional() instead of \"!\"")]
    BangName(String),
    #[error("param name is empty")]
    EmptyName,
}

/// Collects field declarations in order. Re-declaring a name replaces the
/// earlier declaration in place.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<ParamField>,
    errors: Vec<SchemaError>,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field. Fields are required unless the name ends in `?`.
    pub fn field(&mut self, name: &str, ty: impl Into<ParamType>) -> &mut ParamOpts {
        let mut opts = ParamOpts::default();
        let mut name = name.trim();

        if let Some(stripped) = name.strip_suffix('?') {
            name = stripped;
            opts.required = false;
        }
        if name.contains('!') {
            self.errors.push(SchemaError::BangName(name.to_string()));
        } else if name.is_empty() {
            self.errors.push(SchemaError::EmptyName);
        }

        let field = ParamField {
            name: name.to_string(),
            ty: ty.into(),
            opts,
        };

        let idx = if let Some(idx) = self.fields.iter().position(|f| f.name == field.name) {
            self.fields[idx] = field;
            idx
        } else {
            self.fields.push(field);
            self.fields.len() - 1
        };
        &mut self.fields[idx].opts
    }

    /// Declares an optional field.
    pub fn optional(&mut self, name: &str, ty: impl Into<ParamType>) -> &mut ParamOpts {
        self.field(name, ty).optional()
    }

    /// Boolean shorthand: `flag("is_active", false)`.
    pub fn flag(&mut self, name: &str, default: bool) -> &mut ParamOpts {
        self.field(name, ParamType::Boolean).default_to(default)
    }

    /// Finalises the schema. Boolean fields are never required.
    ///
    /// # Errors
    ///
    /// Returns the first declaration error recorded by [`SchemaBuilder::field`].
    pub fn finish(mut self) -> Result<ParamSchema, SchemaError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        for field in &mut self.fields {
            if field.ty == ParamType::Boolean {
                field.opts.required = false;
            }
        }
        Ok(ParamSchema {
            fields: self.fields,
        })
    }
}

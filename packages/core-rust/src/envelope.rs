//! Response envelope: the uniform structure returned for every call.
//!
//! [`Response`] accumulates message, meta, data and errors while a call runs;
//! [`Response::render`] produces the wire-level [`Envelope`]:
//!
//! ```text
//! {"success": bool, "data"?: any, "message"?: string, "meta": {..},
//!  "error"?: {"messages": [..], "details"?: {field: text}, "code"?: any},
//!  "status": int}
//! ```
//!
//! Accumulation is monotonic: errors and meta entries are never retracted.

use serde::{Deserialize, Serialize};

use crate::types::{ErrorCode, Params, Value};

/// Status used when an envelope carries errors and no explicit status.
pub const STATUS_ERROR: u16 = 400;
/// Status used for successful envelopes without an explicit status.
pub const STATUS_OK: u16 = 200;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Error section of the envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Top-level messages in insertion order, without duplicates.
    pub messages: Vec<String>,
    /// Field-keyed validation messages.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<Params>,
    /// First code supplied with an error, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<ErrorCode>,
}

impl ErrorBody {
    /// Detail text recorded for `field`.
    #[must_use]
    pub fn detail(&self, field: &str) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|d| d.get(field))
            .and_then(Value::as_str)
    }
}

/// Rendered response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(default)]
    pub meta: Params,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorBody>,
    pub status: u16,
}

impl Envelope {
    /// Single-error envelope, used when no call could be set up at all
    /// (unknown class, missing action).
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        let mut response = Response::new();
        response.error(text);
        response.render()
    }

    /// Top-level error messages; empty for successful envelopes.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        self.error.as_ref().map_or(&[], |e| e.messages.as_slice())
    }

    /// Canonical JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if a user-supplied value cannot be encoded.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Canonical JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if a user-supplied value cannot be encoded.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// `MsgPack` encoding with named fields, for hosts that speak msgpack.
    ///
    /// # Errors
    ///
    /// Returns an error if a user-supplied value cannot be encoded.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }

    /// Decodes an envelope produced by [`Envelope::to_msgpack`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid envelope.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

// ---------------------------------------------------------------------------
// ErrorOptions
// ---------------------------------------------------------------------------

/// Optional code and status attached to [`Response::error_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorOptions {
    pub code: Option<ErrorCode>,
    pub status: Option<u16>,
}

impl ErrorOptions {
    #[must_use]
    pub fn code(mut self, code: impl Into<ErrorCode>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub const fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

// ---------------------------------------------------------------------------
// Response builder
// ---------------------------------------------------------------------------

/// Per-call envelope accumulator.
#[derive(Debug, Clone, Default)]
pub struct Response {
    message: Option<String>,
    meta: Params,
    data: Option<Value>,
    messages: Vec<String>,
    details: Params,
    code: Option<ErrorCode>,
    status: Option<u16>,
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the human readable message unless one is already set.
    pub fn message(&mut self, value: impl Into<String>) -> &mut Self {
        if self.message.is_none() {
            self.message = Some(value.into());
        }
        self
    }

    /// Sets the message, replacing any earlier one.
    pub fn force_message(&mut self, value: impl Into<String>) -> &mut Self {
        self.message = Some(value.into());
        self
    }

    /// Adds or updates a meta entry.
    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn meta_value(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// Assigns response data. The first non-null assignment wins; `false`,
    /// `0` and `""` occupy the slot like any other value, `null` does not.
    pub fn data(&mut self, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if self.data.is_none() && !value.is_null() {
            self.data = Some(value);
        }
        self
    }

    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.data.is_some()
    }

    #[must_use]
    pub const fn data_value(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Sets the response status unless one is already set.
    pub fn status(&mut self, status: u16) -> &mut Self {
        if self.status.is_none() {
            self.status = Some(status);
        }
        self
    }

    /// Adds a top-level error message. Duplicate texts are kept once.
    pub fn error(&mut self, text: impl Into<String>) -> &mut Self {
        self.error_with(text, ErrorOptions::default())
    }

    /// Adds a top-level error message with an optional code and status.
    /// The first code and the first status supplied are kept.
    pub fn error_with(&mut self, text: impl Into<String>, opts: ErrorOptions) -> &mut Self {
        if let Some(status) = opts.status {
            self.status(status);
        }
        if self.code.is_none() {
            self.code = opts.code;
        }

        let text = text.into();
        if !self.messages.contains(&text) {
            self.messages.push(text);
        }
        self
    }

    /// Records a field error: a `details` entry plus a combined
    /// `"text (field)"` top-level message.
    pub fn error_detail(&mut self, field: impl Into<String>, text: impl Into<String>) -> &mut Self {
        let field = field.into();
        let text = text.into();
        self.error(format!("{text} ({field})"));
        if !self.details.contains_key(&field) {
            self.details.insert(field, Value::String(text));
        }
        self
    }

    /// True iff any top-level message or detail exists.
    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.messages.is_empty() || !self.details.is_empty()
    }

    #[must_use]
    pub fn error_messages(&self) -> &[String] {
        &self.messages
    }

    /// Renders the envelope. The builder stays usable; rendering twice yields
    /// the same envelope.
    #[must_use]
    pub fn render(&self) -> Envelope {
        let has_error = self.has_error();

        let error = has_error.then(|| ErrorBody {
            messages: self.messages.clone(),
            details: (!self.details.is_empty()).then(|| self.details.clone()),
            code: self.code.clone(),
        });

        let fallback = if has_error { STATUS_ERROR } else { STATUS_OK };

        Envelope {
            success: !has_error,
            data: self.data.clone(),
            message: self.message.clone(),
            meta: self.meta.clone(),
            error,
            status: self.status.unwrap_or(fallback),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Error families: load-time configuration errors, runtime dispatch errors
//! and auto-mount classification errors.

use std::any::Any;

use joshua_core::{ErrorCode, Scope, SchemaError};

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// An intentional failure raised by user code: a text, optionally with a
/// symbolic or numeric code and a status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{text}")]
pub struct ControlledError {
    pub text: String,
    pub code: Option<ErrorCode>,
    pub status: Option<u16>,
}

impl ControlledError {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
            status: None,
        }
    }

    /// Error identified by code only; the text is the code itself unless a
    /// named error supplies one.
    #[must_use]
    pub fn code(code: impl Into<ErrorCode>) -> Self {
        let code = code.into();
        Self {
            text: code.to_string(),
            code: Some(code),
            status: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<ErrorCode>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Key used to look the error up among named errors: the code if one
    /// was given, else the text as a symbol.
    #[must_use]
    pub fn lookup_key(&self) -> ErrorCode {
        self.code
            .clone()
            .unwrap_or_else(|| ErrorCode::Symbol(self.text.clone()))
    }
}

/// Failure of a handler, hook or annotation.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Controlled(#[from] ControlledError),
    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl DispatchError {
    /// Wraps any error as unhandled.
    pub fn unhandled<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unhandled(anyhow::Error::new(err))
    }

    #[must_use]
    pub const fn is_controlled(&self) -> bool {
        matches!(self, Self::Controlled(_))
    }
}

/// A panic caught at the dispatch boundary.
#[derive(Debug, thiserror::Error)]
#[error("panic: {0}")]
pub struct PanicError(pub String);

impl PanicError {
    pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let text = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self(text)
    }
}

// ---------------------------------------------------------------------------
// Load time
// ---------------------------------------------------------------------------

/// Errors found while declaring classes and building the registry. Fatal:
/// a registry with configuration errors is never built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("class {0} is already registered")]
    DuplicateClass(String),
    #[error("class {class}: parent class {parent} is not registered")]
    UnknownParent { class: String, parent: String },
    #[error("class {class}: {primitive} can only be used inside member or collection blocks")]
    OutsideMethodBlock {
        class: String,
        primitive: &'static str,
    },
    #[error("class {class}: icons can not be added on methods")]
    IconOnMethod { class: String },
    #[error("class {class}: member and collection blocks can not be nested")]
    NestedBlock { class: String },
    #[error("class {class}: \"{method}\" is not an allowed http method type")]
    DisallowedHttpMethod { class: String, method: String },
    #[error("class {class}: method {scope}:{name} is defined twice")]
    DuplicateMethod {
        class: String,
        scope: Scope,
        name: String,
    },
    #[error("class {class}: declarations at the end of the {scope} block are not attached to a method")]
    DanglingDeclaration { class: String, scope: Scope },
    #[error("class {class}: annotation \"{annotation}\" is not registered")]
    UnknownAnnotation { class: String, annotation: String },
    #[error("class {class}: plugin \"{plugin}\" is not defined")]
    UnknownPlugin { class: String, plugin: String },
    #[error("class {class}: {source}")]
    Schema {
        class: String,
        #[source]
        source: SchemaError,
    },
    #[error("class {class}, method {scope}:{name}: {detail}")]
    UnresolvedParam {
        class: String,
        scope: Scope,
        name: String,
        detail: String,
    },
}

// ---------------------------------------------------------------------------
// Auto-mount
// ---------------------------------------------------------------------------

/// Errors from turning an inbound host request into a call.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("request path {path} is not below mount point {mount_on}")]
    OutsideMount { path: String, mount_on: String },
    #[error("API class not defined")]
    MissingClass,
    #[error("malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("request body could not be read: {0}")]
    UnreadableBody(anyhow::Error),
}

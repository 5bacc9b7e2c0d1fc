//! Endpoint descriptors and the function types attached to them.

use std::fmt;
use std::sync::Arc;

use http::Method;
use joshua_core::{ParamSchema, Scope, Value};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::call::Call;
use crate::error::DispatchError;

/// Endpoint body. The returned value becomes the response data unless data
/// was already set; `Value::Null` means "nothing".
pub type Handler = Arc<dyn Fn(&mut Call<'_>) -> Result<Value, DispatchError> + Send + Sync>;

/// Lifecycle hook.
pub type Hook = Arc<dyn Fn(&mut Call<'_>) -> Result<(), DispatchError> + Send + Sync>;

/// Named annotation body, invoked with the arguments captured at declaration.
pub type AnnotationFn = Arc<dyn Fn(&mut Call<'_>, &[Value]) -> Result<(), DispatchError> + Send + Sync>;

// ---------------------------------------------------------------------------
// HookKey
// ---------------------------------------------------------------------------

/// Hook list key: `{before, after} x {all, collection, member}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKey {
    BeforeAll,
    BeforeCollection,
    BeforeMember,
    AfterCollection,
    AfterMember,
    AfterAll,
}

impl HookKey {
    /// Before hook key of a declaration block; `None` means class level.
    #[must_use]
    pub const fn before(scope: Option<Scope>) -> Self {
        match scope {
            None => Self::BeforeAll,
            Some(Scope::Collection) => Self::BeforeCollection,
            Some(Scope::Member) => Self::BeforeMember,
        }
    }

    #[must_use]
    pub const fn after(scope: Option<Scope>) -> Self {
        match scope {
            None => Self::AfterAll,
            Some(Scope::Collection) => Self::AfterCollection,
            Some(Scope::Member) => Self::AfterMember,
        }
    }
}

// ---------------------------------------------------------------------------
// EndpointDescriptor
// ---------------------------------------------------------------------------

/// Reference to a registered annotation plus its captured arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationRef {
    pub name: String,
    pub args: Vec<Value>,
}

fn serialize_methods<S: Serializer>(methods: &[Method], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(methods.len()))?;
    for method in methods {
        seq.serialize_element(method.as_str())?;
    }
    seq.end()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

/// Immutable metadata and handler of one `(scope, name)` endpoint.
///
/// Serializes to the documentation-facing metadata; the handler and parent
/// link are skipped.
#[derive(Clone, Serialize)]
pub struct EndpointDescriptor {
    pub scope: Scope,
    pub name: String,
    /// Class that declared this descriptor.
    pub owner: String,
    #[serde(skip_serializing_if = "ParamSchema::is_empty")]
    pub params: ParamSchema,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<AnnotationRef>,
    /// Methods admitted in addition to POST.
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "serialize_methods")]
    pub allow: Vec<Method>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(rename = "unsafe", skip_serializing_if = "is_false")]
    pub is_unsafe: bool,
    #[serde(skip)]
    pub(crate) handler: Handler,
    /// Descriptor this one overrides, for super calls.
    #[serde(skip)]
    pub(crate) parent: Option<Arc<EndpointDescriptor>>,
}

impl EndpointDescriptor {
    /// Whether a request with `method` is admitted: POST always, plus the
    /// allow set.
    #[must_use]
    pub fn admits(&self, method: &Method) -> bool {
        *method == Method::POST || self.allow.contains(method)
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.parent.as_deref()
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("scope", &self.scope)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("params", &self.params.len())
            .field("annotations", &self.annotations)
            .field("allow", &self.allow)
            .field("has_parent", &self.parent.is_some())
            .finish_non_exhaustive()
    }
}

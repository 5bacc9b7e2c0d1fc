//! Per-call instance context handed to handlers, hooks and annotations.

use http::{Extensions, Method};
use joshua_core::{CallRequest, ErrorCode, HostAdapter, Params, Response, Scope, Value};

use crate::descriptor::EndpointDescriptor;
use crate::error::{ControlledError, DispatchError};
use crate::registry::{Registry, ResolvedClass};

/// Everything a running call can see and touch.
///
/// The response builder, the validated params and the per-call state
/// ([`Call::insert`] / [`Call::get`]) are owned by the call; registry data is
/// borrowed for its duration.
pub struct Call<'r> {
    registry: &'r Registry,
    class: &'r ResolvedClass,
    descriptor: Option<&'r EndpointDescriptor>,
    request: CallRequest,
    response: Response,
    state: Extensions,
    host: Option<&'r dyn HostAdapter>,
}

impl<'r> Call<'r> {
    pub(crate) fn new(
        registry: &'r Registry,
        class: &'r ResolvedClass,
        request: CallRequest,
        host: Option<&'r dyn HostAdapter>,
    ) -> Self {
        let descriptor = class.method(request.scope(), &request.action);
        Self {
            registry,
            class,
            descriptor,
            request,
            response: Response::new(),
            state: Extensions::new(),
            host,
        }
    }

    // -- request -------------------------------------------------------------

    #[must_use]
    pub fn action(&self) -> &str {
        &self.request.action
    }

    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.request.scope()
    }

    /// Member id as given.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.request.id.as_deref()
    }

    /// Member id, if it is an integer in canonical form.
    #[must_use]
    pub fn id_i64(&self) -> Option<i64> {
        let id = self.id()?;
        id.parse::<i64>().ok().filter(|n| n.to_string() == id)
    }

    /// Params after validation: declared fields coerced, others as sent.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.request.params
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.request.params.get(name)
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.request.params
    }

    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.request.bearer.as_deref()
    }

    #[must_use]
    pub const fn development(&self) -> bool {
        self.request.development
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.request.method
    }

    /// Unique id of this call, as text.
    #[must_use]
    pub fn uid(&self) -> String {
        self.request.uid.to_string()
    }

    #[must_use]
    pub const fn request(&self) -> &CallRequest {
        &self.request
    }

    // -- registry ------------------------------------------------------------

    #[must_use]
    pub fn class_name(&self) -> &'r str {
        &self.class.name
    }

    #[must_use]
    pub const fn class(&self) -> &'r ResolvedClass {
        self.class
    }

    /// Descriptor being executed; `None` when the action is not defined.
    #[must_use]
    pub const fn descriptor(&self) -> Option<&'r EndpointDescriptor> {
        self.descriptor
    }

    #[must_use]
    pub const fn registry(&self) -> &'r Registry {
        self.registry
    }

    #[must_use]
    pub fn host(&self) -> Option<&'r dyn HostAdapter> {
        self.host
    }

    // -- response ------------------------------------------------------------

    pub fn response(&mut self) -> &mut Response {
        &mut self.response
    }

    #[must_use]
    pub const fn response_ref(&self) -> &Response {
        &self.response
    }

    /// Shorthand for `response().message(..)`.
    pub fn message(&mut self, text: impl Into<String>) -> &mut Response {
        self.response.message(text)
    }

    /// Shorthand for `response().meta(..)`.
    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Response {
        self.response.meta(key, value)
    }

    /// Shorthand for `response().data(..)`.
    pub fn data(&mut self, value: impl Into<Value>) -> &mut Response {
        self.response.data(value)
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }

    // -- state ---------------------------------------------------------------

    /// Stores per-call state, one value per type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.state.insert(value)
    }

    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.state.get::<T>()
    }

    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.state.get_mut::<T>()
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.state.remove::<T>()
    }

    // -- errors --------------------------------------------------------------

    /// Controlled error with a text. Return it as `Err(call.error(..))`.
    #[must_use]
    pub fn error(&self, text: impl Into<String>) -> DispatchError {
        ControlledError::new(text).into()
    }

    /// Controlled error identified by a code, resolved through the named
    /// errors registered on the registry.
    #[must_use]
    pub fn error_code(&self, code: impl Into<ErrorCode>) -> DispatchError {
        ControlledError::code(code).into()
    }

    // -- composition ---------------------------------------------------------

    /// Runs the handler this endpoint overrides, in this call's context.
    ///
    /// # Errors
    ///
    /// Whatever the parent handler returns; an unhandled error if the
    /// endpoint overrides nothing.
    pub fn super_call(&mut self) -> Result<Value, DispatchError> {
        let current = self.descriptor;
        let Some(parent) = current.and_then(EndpointDescriptor::parent) else {
            return Err(anyhow::anyhow!(
                "{}: method {}:{} has no parent implementation",
                self.class.name,
                self.scope(),
                self.action()
            )
            .into());
        };

        self.descriptor = Some(parent);
        let result = (parent.handler())(self);
        self.descriptor = current;
        result
    }
}

//! Class declaration DSL.
//!
//! A class is declared through a [`ClassBuilder`]. Declaration primitives
//! (`params`, `desc`, `detail`, `annotate`, `allow`, `mark_unsafe`) fill a
//! pending descriptor; [`ClassBuilder::def`] consumes it. Both only make sense
//! inside a `collection` or `member` block:
//!
//! ```
//! use joshua_engine::Registry;
//! use serde_json::json;
//!
//! let mut registry = Registry::builder();
//! registry.class("CompanyApi", None, |c| {
//!     c.collection(|c| {
//!         c.desc("List companies");
//!         c.params(|p| {
//!             p.field("country_id?", "integer");
//!         });
//!         c.def("index", |_| Ok(json!(["ACME corp"])));
//!     });
//! });
//! let registry = registry.build().unwrap();
//! assert!(registry.render("CompanyApi", "index", Default::default()).success);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use joshua_core::{SchemaBuilder, Scope, Value};
use serde::Serialize;

use crate::call::Call;
use crate::descriptor::{AnnotationRef, EndpointDescriptor, Handler, Hook, HookKey};
use crate::error::{ConfigError, DispatchError};

/// Methods that may be admitted besides POST.
const ALLOWED_HTTP_METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "TRACE"];

/// Reusable declaration block applied by name.
pub type Plugin = Arc<dyn Fn(&mut ClassBuilder<'_>) + Send + Sync>;

/// Class-level documentation info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Declarations of one class, before ancestry resolution.
pub(crate) struct ClassDef {
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    pub(crate) info: ClassInfo,
    pub(crate) methods: Vec<EndpointDescriptor>,
    pub(crate) hooks: HashMap<HookKey, Vec<Hook>>,
}

#[derive(Default)]
struct Pending {
    params: Option<joshua_core::ParamSchema>,
    annotations: Vec<AnnotationRef>,
    allow: Vec<Method>,
    desc: Option<String>,
    detail: Option<String>,
    is_unsafe: bool,
    touched: bool,
}

/// Declaration surface of one class.
pub struct ClassBuilder<'p> {
    def: ClassDef,
    scope: Option<Scope>,
    pending: Pending,
    plugins: &'p HashMap<String, Plugin>,
    errors: Vec<ConfigError>,
}

impl<'p> ClassBuilder<'p> {
    pub(crate) fn new(name: &str, parent: Option<&str>, plugins: &'p HashMap<String, Plugin>) -> Self {
        Self {
            def: ClassDef {
                name: name.to_string(),
                parent: parent.map(str::to_string),
                info: ClassInfo::default(),
                methods: Vec::new(),
                hooks: HashMap::new(),
            },
            scope: None,
            pending: Pending::default(),
            plugins,
            errors: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> (ClassDef, Vec<ConfigError>) {
        (self.def, self.errors)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Current block scope; `None` at class level.
    #[must_use]
    pub const fn scope(&self) -> Option<Scope> {
        self.scope
    }

    // -- blocks ------------------------------------------------------------

    /// Declares collection endpoints (no id).
    pub fn collection(&mut self, block: impl FnOnce(&mut Self)) -> &mut Self {
        self.block(Scope::Collection, block)
    }

    /// Declares member endpoints (id required).
    pub fn member(&mut self, block: impl FnOnce(&mut Self)) -> &mut Self {
        self.block(Scope::Member, block)
    }

    fn block(&mut self, scope: Scope, block: impl FnOnce(&mut Self)) -> &mut Self {
        if self.scope.is_some() {
            self.error(|class| ConfigError::NestedBlock { class });
            return self;
        }

        self.scope = Some(scope);
        block(self);
        if self.pending.touched {
            self.error(|class| ConfigError::DanglingDeclaration { class, scope });
        }
        self.pending = Pending::default();
        self.scope = None;
        self
    }

    // -- documentation -----------------------------------------------------

    /// Method description inside a block, class description outside.
    pub fn desc(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if self.scope.is_some() {
            self.pending.desc = Some(text);
            self.pending.touched = true;
        } else {
            self.def.info.desc = Some(text);
        }
        self
    }

    /// Detailed description; empty text is ignored.
    pub fn detail(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if text.is_empty() {
            return self;
        }
        if self.scope.is_some() {
            self.pending.detail = Some(text);
            self.pending.touched = true;
        } else {
            self.def.info.detail = Some(text);
        }
        self
    }

    /// Class icon (SVG markup). Not available on methods.
    pub fn icon(&mut self, svg: impl Into<String>) -> &mut Self {
        if self.scope.is_some() {
            self.error(|class| ConfigError::IconOnMethod { class });
        } else {
            self.def.info.icon = Some(svg.into());
        }
        self
    }

    // -- pending declarations ----------------------------------------------

    /// Params schema of the next method.
    pub fn params(&mut self, declare: impl FnOnce(&mut SchemaBuilder)) -> &mut Self {
        if !self.in_block("params") {
            return self;
        }
        let mut schema = SchemaBuilder::new();
        declare(&mut schema);
        match schema.finish() {
            Ok(schema) => self.pending.params = Some(schema),
            Err(source) => self.error(|class| ConfigError::Schema { class, source }),
        }
        self.pending.touched = true;
        self
    }

    /// Attaches a registered annotation, with arguments, to the next method.
    pub fn annotate<I, V>(&mut self, name: impl Into<String>, args: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if !self.in_block("annotation") {
            return self;
        }
        let name = name.into();
        let args: Vec<Value> = args.into_iter().map(Into::into).collect();
        if let Some(existing) = self.pending.annotations.iter_mut().find(|a| a.name == name) {
            existing.args = args;
        } else {
            self.pending.annotations.push(AnnotationRef { name, args });
        }
        self.pending.touched = true;
        self
    }

    /// Admits an HTTP method besides POST for the next method.
    pub fn allow(&mut self, method: &str) -> &mut Self {
        if !self.in_block("allow") {
            return self;
        }
        let upper = method.trim().to_ascii_uppercase();
        match upper.parse::<Method>() {
            Ok(parsed) if ALLOWED_HTTP_METHODS.contains(&upper.as_str()) => {
                if !self.pending.allow.contains(&parsed) {
                    self.pending.allow.push(parsed);
                }
            }
            _ => self.error(|class| ConfigError::DisallowedHttpMethod {
                class,
                method: method.to_string(),
            }),
        }
        self.pending.touched = true;
        self
    }

    /// Marks the next method as callable without a bearer token.
    pub fn mark_unsafe(&mut self) -> &mut Self {
        if self.in_block("unsafe") {
            self.pending.is_unsafe = true;
            self.pending.touched = true;
        }
        self
    }

    /// Registers a handler under the current block, consuming the pending
    /// declarations.
    pub fn def<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&mut Call<'_>) -> Result<Value, DispatchError> + Send + Sync + 'static,
    {
        let Some(scope) = self.scope else {
            self.error(|class| ConfigError::OutsideMethodBlock {
                class,
                primitive: "def",
            });
            return self;
        };
        let name = name.into();

        if self
            .def
            .methods
            .iter()
            .any(|m| m.scope == scope && m.name == name)
        {
            let name = name.clone();
            self.error(|class| ConfigError::DuplicateMethod { class, scope, name });
        }

        let pending = std::mem::take(&mut self.pending);
        let handler: Handler = Arc::new(handler);
        self.def.methods.push(EndpointDescriptor {
            scope,
            name,
            owner: self.def.name.clone(),
            params: pending.params.unwrap_or_default(),
            annotations: pending.annotations,
            allow: pending.allow,
            desc: pending.desc,
            detail: pending.detail,
            is_unsafe: pending.is_unsafe,
            handler,
            parent: None,
        });
        self
    }

    // -- hooks -------------------------------------------------------------

    /// Before hook for the current block, or for every call at class level.
    pub fn before<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Call<'_>) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        let key = HookKey::before(self.scope);
        self.def.hooks.entry(key).or_default().push(Arc::new(hook));
        self
    }

    /// After hook for the current block, or for every call at class level.
    /// Class-level after hooks run even when the call failed.
    pub fn after<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut Call<'_>) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        let key = HookKey::after(self.scope);
        self.def.hooks.entry(key).or_default().push(Arc::new(hook));
        self
    }

    // -- composition -------------------------------------------------------

    /// Applies a plugin registered on the registry builder.
    pub fn plugin(&mut self, name: &str) -> &mut Self {
        let plugins = self.plugins;
        match plugins.get(name) {
            Some(plugin) => plugin(self),
            None => self.error(|class| ConfigError::UnknownPlugin {
                class,
                plugin: name.to_string(),
            }),
        }
        self
    }

    /// Applies a plain declaration function, the way a shared module would
    /// be mixed into several classes.
    pub fn include(&mut self, module: impl FnOnce(&mut Self)) -> &mut Self {
        module(self);
        self
    }

    // -- helpers -----------------------------------------------------------

    fn in_block(&mut self, primitive: &'static str) -> bool {
        if self.scope.is_none() {
            self.error(|class| ConfigError::OutsideMethodBlock { class, primitive });
            return false;
        }
        true
    }

    fn error(&mut self, make: impl FnOnce(String) -> ConfigError) {
        self.errors.push(make(self.def.name.clone()));
    }
}

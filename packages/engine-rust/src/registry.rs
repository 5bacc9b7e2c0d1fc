//! Registry: immutable lookup tables built once at load time.
//!
//! [`RegistryBuilder`] collects classes, annotations, named errors, rescue
//! handlers, plugins, custom param types and models. [`RegistryBuilder::build`]
//! validates everything, resolves ancestry once, and freezes the result into
//! a [`Registry`] that is `Send + Sync` and shared across calls.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use joshua_core::{ErrorCode, ModelHook, ParamOpts, Params, SchemaBuilder, Scope, Validator, Value};
use serde::Serialize;

use crate::call::Call;
use crate::class::{ClassBuilder, ClassDef, ClassInfo, Plugin};
use crate::config::EngineConfig;
use crate::descriptor::{AnnotationFn, EndpointDescriptor, Hook, HookKey};
use crate::error::{ConfigError, DispatchError};
use crate::observability::{DiagnosticSink, TracingSink};

/// Named error entry: static text, or a handler run in the call context.
#[derive(Clone)]
pub enum NamedError {
    Text(String),
    Handler(Arc<dyn Fn(&mut Call<'_>) + Send + Sync>),
}

impl fmt::Debug for NamedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// Handler for unhandled errors.
pub type RescueFn = Arc<dyn Fn(&mut Call<'_>, &anyhow::Error) + Send + Sync>;

type ErrorMatcher = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

// ---------------------------------------------------------------------------
// ResolvedClass
// ---------------------------------------------------------------------------

/// A class with its ancestry folded in.
///
/// Descriptor maps hold the most-derived descriptor per `(scope, name)`;
/// inherited entries are shared with the ancestor, never copied or mutated.
/// Hook lists are ordered root to leaf.
pub struct ResolvedClass {
    pub name: String,
    pub parent: Option<String>,
    pub info: ClassInfo,
    /// Leaf first: this class, its parent, ..., the root.
    pub ancestry: Vec<String>,
    collection: HashMap<String, Arc<EndpointDescriptor>>,
    member: HashMap<String, Arc<EndpointDescriptor>>,
    hooks: HashMap<HookKey, Vec<Hook>>,
}

impl ResolvedClass {
    #[must_use]
    pub fn method(&self, scope: Scope, name: &str) -> Option<&EndpointDescriptor> {
        self.methods_map(scope).get(name).map(AsRef::as_ref)
    }

    /// Endpoints of one scope, by name.
    pub fn methods(&self, scope: Scope) -> impl Iterator<Item = &EndpointDescriptor> {
        let mut all: Vec<&EndpointDescriptor> = self.methods_map(scope).values().map(AsRef::as_ref).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all.into_iter()
    }

    #[must_use]
    pub fn hooks(&self, key: HookKey) -> &[Hook] {
        self.hooks.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Serializable metadata for documentation renderers.
    #[must_use]
    pub fn export(&self) -> ClassExport<'_> {
        let by_name = |scope| -> BTreeMap<&str, &EndpointDescriptor> {
            self.methods_map(scope)
                .iter()
                .map(|(name, d)| (name.as_str(), d.as_ref()))
                .collect()
        };
        ClassExport {
            name: &self.name,
            parent: self.parent.as_deref(),
            info: &self.info,
            collection: by_name(Scope::Collection),
            member: by_name(Scope::Member),
        }
    }

    const fn methods_map(&self, scope: Scope) -> &HashMap<String, Arc<EndpointDescriptor>> {
        match scope {
            Scope::Collection => &self.collection,
            Scope::Member => &self.member,
        }
    }
}

impl fmt::Debug for ResolvedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedClass")
            .field("name", &self.name)
            .field("ancestry", &self.ancestry)
            .field("collection", &self.collection.len())
            .field("member", &self.member.len())
            .finish_non_exhaustive()
    }
}

/// Exported class metadata.
#[derive(Debug, Serialize)]
pub struct ClassExport<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<&'a str>,
    #[serde(flatten)]
    pub info: &'a ClassInfo,
    pub collection: BTreeMap<&'a str, &'a EndpointDescriptor>,
    pub member: BTreeMap<&'a str, &'a EndpointDescriptor>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Frozen engine state. Read-only during calls.
pub struct Registry {
    pub(crate) config: EngineConfig,
    pub(crate) classes: HashMap<String, ResolvedClass>,
    order: Vec<String>,
    pub(crate) annotations: HashMap<String, AnnotationFn>,
    pub(crate) named: HashMap<ErrorCode, NamedError>,
    pub(crate) rescue_kinds: Vec<(ErrorMatcher, RescueFn)>,
    pub(crate) rescue_all: Option<RescueFn>,
    pub(crate) validator: Validator,
    pub(crate) sink: Arc<dyn DiagnosticSink>,
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new(EngineConfig::default())
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ResolvedClass> {
        self.classes.get(name)
    }

    /// Classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &ResolvedClass> {
        self.order.iter().filter_map(|name| self.classes.get(name))
    }

    #[must_use]
    pub const fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Metadata of every class, in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if a declared default cannot be encoded.
    pub fn export(&self) -> serde_json::Result<Value> {
        let all: Vec<ClassExport<'_>> = self.classes().map(ResolvedClass::export).collect();
        serde_json::to_value(all)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("classes", &self.order)
            .field("named", &self.named.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// RegistryBuilder
// ---------------------------------------------------------------------------

/// Load-time registration surface.
pub struct RegistryBuilder {
    config: EngineConfig,
    classes: Vec<ClassDef>,
    annotations: HashMap<String, AnnotationFn>,
    named: HashMap<ErrorCode, NamedError>,
    rescue_kinds: Vec<(ErrorMatcher, RescueFn)>,
    rescue_all: Option<RescueFn>,
    plugins: HashMap<String, Plugin>,
    validator: Validator,
    sink: Arc<dyn DiagnosticSink>,
    errors: Vec<ConfigError>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            validator: Validator::new(config.locale),
            config,
            classes: Vec::new(),
            annotations: HashMap::new(),
            named: HashMap::new(),
            rescue_kinds: Vec::new(),
            rescue_all: None,
            plugins: HashMap::new(),
            sink: Arc::new(TracingSink),
            errors: Vec::new(),
        }
    }

    /// Replaces the configuration. The validator locale follows it.
    pub fn config(&mut self, config: EngineConfig) -> &mut Self {
        self.validator.set_locale(config.locale);
        self.config = config;
        self
    }

    /// Declares a class. A parent must be declared before its children.
    pub fn class(
        &mut self,
        name: &str,
        parent: Option<&str>,
        declare: impl FnOnce(&mut ClassBuilder<'_>),
    ) -> &mut Self {
        if self.classes.iter().any(|c| c.name == name) {
            self.errors.push(ConfigError::DuplicateClass(name.to_string()));
            return self;
        }
        if let Some(parent) = parent {
            if !self.classes.iter().any(|c| c.name == parent) {
                self.errors.push(ConfigError::UnknownParent {
                    class: name.to_string(),
                    parent: parent.to_string(),
                });
                return self;
            }
        }

        let mut builder = ClassBuilder::new(name, parent, &self.plugins);
        declare(&mut builder);
        let (def, errors) = builder.finish();
        self.errors.extend(errors);
        self.classes.push(def);
        self
    }

    /// Registers a named annotation.
    pub fn annotation<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: Fn(&mut Call<'_>, &[Value]) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        self.annotations.insert(name.into(), Arc::new(body));
        self
    }

    /// Registers a plugin: a declaration block classes apply by name.
    pub fn plugin<F>(&mut self, name: impl Into<String>, block: F) -> &mut Self
    where
        F: Fn(&mut ClassBuilder<'_>) + Send + Sync + 'static,
    {
        self.plugins.insert(name.into(), Arc::new(block));
        self
    }

    /// Named error with static text: `rescue_from(404, "Document not found")`.
    pub fn rescue_from(&mut self, code: impl Into<ErrorCode>, text: impl Into<String>) -> &mut Self {
        self.named.insert(code.into(), NamedError::Text(text.into()));
        self
    }

    /// Named error resolved by a handler that may shape the response freely.
    pub fn rescue_from_with<F>(&mut self, code: impl Into<ErrorCode>, handler: F) -> &mut Self
    where
        F: Fn(&mut Call<'_>) + Send + Sync + 'static,
    {
        self.named.insert(code.into(), NamedError::Handler(Arc::new(handler)));
        self
    }

    /// Handler for unhandled errors of a concrete type.
    pub fn rescue_kind<E, F>(&mut self, handler: F) -> &mut Self
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
        F: Fn(&mut Call<'_>, &anyhow::Error) + Send + Sync + 'static,
    {
        let matcher: ErrorMatcher = Arc::new(|err: &anyhow::Error| err.downcast_ref::<E>().is_some());
        self.rescue_kinds.push((matcher, Arc::new(handler)));
        self
    }

    /// Catch-all handler for unhandled errors.
    pub fn rescue_all<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Call<'_>, &anyhow::Error) + Send + Sync + 'static,
    {
        self.rescue_all = Some(Arc::new(handler));
        self
    }

    /// Registers a custom param type checker.
    pub fn param_type<F>(&mut self, name: impl Into<String>, check: F) -> &mut Self
    where
        F: Fn(&Value, &ParamOpts) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.validator.register_type(name, check);
        self
    }

    /// Registers a named model for `model` params.
    pub fn model(&mut self, name: impl Into<String>, declare: impl FnOnce(&mut SchemaBuilder)) -> &mut Self {
        self.model_inner(name.into(), declare, None)
    }

    /// Registers a named model with a post-process hook.
    pub fn model_with<F>(
        &mut self,
        name: impl Into<String>,
        declare: impl FnOnce(&mut SchemaBuilder),
        hook: F,
    ) -> &mut Self
    where
        F: Fn(&mut Params) -> Result<(), String> + Send + Sync + 'static,
    {
        let hook: ModelHook = Arc::new(hook);
        self.model_inner(name.into(), declare, Some(hook))
    }

    fn model_inner(
        &mut self,
        name: String,
        declare: impl FnOnce(&mut SchemaBuilder),
        hook: Option<ModelHook>,
    ) -> &mut Self {
        let mut schema = SchemaBuilder::new();
        declare(&mut schema);
        match schema.finish() {
            Ok(schema) => self.validator.register_model(name, schema, hook),
            Err(source) => self.errors.push(ConfigError::Schema {
                class: format!("model {name}"),
                source,
            }),
        }
        self
    }

    /// Replaces the diagnostic sink that receives unhandled errors.
    pub fn diagnostics(&mut self, sink: Arc<dyn DiagnosticSink>) -> &mut Self {
        self.sink = sink;
        self
    }

    /// Validates all declarations and resolves ancestry.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found, in declaration order.
    pub fn build(self) -> Result<Registry, ConfigError> {
        let Self {
            config,
            classes,
            annotations,
            named,
            rescue_kinds,
            rescue_all,
            plugins: _,
            validator,
            sink,
            errors,
        } = self;

        if let Some(err) = errors.into_iter().next() {
            return Err(err);
        }

        let mut resolved: HashMap<String, ResolvedClass> = HashMap::with_capacity(classes.len());
        let mut order = Vec::with_capacity(classes.len());

        for def in classes {
            check_references(&def, &annotations, &validator)?;
            let parent = def.parent.as_deref().and_then(|p| resolved.get(p));
            let class = resolve(def, parent);
            tracing::debug!(
                class = %class.name,
                collection = class.collection.len(),
                member = class.member.len(),
                "class resolved"
            );
            order.push(class.name.clone());
            resolved.insert(class.name.clone(), class);
        }

        Ok(Registry {
            config,
            classes: resolved,
            order,
            annotations,
            named,
            rescue_kinds,
            rescue_all,
            validator,
            sink,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Annotations, custom types and models referenced by a class must exist.
fn check_references(
    def: &ClassDef,
    annotations: &HashMap<String, AnnotationFn>,
    validator: &Validator,
) -> Result<(), ConfigError> {
    for method in &def.methods {
        if let Some(missing) = method
            .annotations
            .iter()
            .find(|a| !annotations.contains_key(&a.name))
        {
            return Err(ConfigError::UnknownAnnotation {
                class: def.name.clone(),
                annotation: missing.name.clone(),
            });
        }
        if let Some(err) = validator.unresolved(&method.params).into_iter().next() {
            return Err(ConfigError::UnresolvedParam {
                class: def.name.clone(),
                scope: method.scope,
                name: method.name.clone(),
                detail: err.to_string(),
            });
        }
    }
    Ok(())
}

/// Folds a class over its already-resolved parent.
fn resolve(def: ClassDef, parent: Option<&ResolvedClass>) -> ResolvedClass {
    let mut collection = HashMap::new();
    let mut member = HashMap::new();

    for mut method in def.methods {
        let inherited = parent.and_then(|p| p.methods_map(method.scope).get(&method.name));
        method.parent = inherited.cloned();
        let target = match method.scope {
            Scope::Collection => &mut collection,
            Scope::Member => &mut member,
        };
        target.insert(method.name.clone(), Arc::new(method));
    }

    let mut ancestry = vec![def.name.clone()];
    let mut hooks: HashMap<HookKey, Vec<Hook>> = HashMap::new();

    if let Some(parent) = parent {
        for (name, descriptor) in &parent.collection {
            collection
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(descriptor));
        }
        for (name, descriptor) in &parent.member {
            member
                .entry(name.clone())
                .or_insert_with(|| Arc::clone(descriptor));
        }
        ancestry.extend(parent.ancestry.iter().cloned());
        hooks.clone_from(&parent.hooks);
    }

    for (key, own) in def.hooks {
        hooks.entry(key).or_default().extend(own);
    }

    ResolvedClass {
        name: def.name,
        parent: def.parent,
        info: def.info,
        ancestry,
        collection,
        member,
        hooks,
    }
}

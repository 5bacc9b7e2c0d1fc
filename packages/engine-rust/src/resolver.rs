//! Turning an action spec and options into a call, and call-style proxies.

use http::Method;
use joshua_core::{CallRequest, Envelope, HostAdapter, Params, Value};

use crate::dispatch;
use crate::registry::Registry;

// ---------------------------------------------------------------------------
// ActionSpec
// ---------------------------------------------------------------------------

/// What to call: a bare action (collection scope) or an id plus action
/// (member scope).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSpec {
    Collection(String),
    Member { id: String, action: String },
}

impl ActionSpec {
    /// Path form: `[action]` or `[id, action]`. Extra segments are ignored;
    /// no segments yields an empty action.
    #[must_use]
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Self {
        match segments {
            [] => Self::Collection(String::new()),
            [action] => Self::Collection(action.as_ref().to_string()),
            [id, action, ..] => Self::Member {
                id: id.as_ref().to_string(),
                action: action.as_ref().to_string(),
            },
        }
    }

    #[must_use]
    pub fn action(&self) -> &str {
        match self {
            Self::Collection(action) | Self::Member { action, .. } => action,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Collection(_) => None,
            Self::Member { id, .. } => Some(id),
        }
    }
}

impl From<&str> for ActionSpec {
    fn from(action: &str) -> Self {
        Self::Collection(action.to_string())
    }
}

impl From<String> for ActionSpec {
    fn from(action: String) -> Self {
        Self::Collection(action)
    }
}

impl From<(&str, &str)> for ActionSpec {
    fn from((id, action): (&str, &str)) -> Self {
        Self::Member {
            id: id.to_string(),
            action: action.to_string(),
        }
    }
}

impl From<(i64, &str)> for ActionSpec {
    fn from((id, action): (i64, &str)) -> Self {
        Self::Member {
            id: id.to_string(),
            action: action.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// RenderOptions
// ---------------------------------------------------------------------------

/// Per-call options for [`Registry::render`].
#[derive(Default, Clone)]
pub struct RenderOptions<'h> {
    pub params: Params,
    /// Member id; an id in the action spec takes precedence.
    pub id: Option<String>,
    pub bearer: Option<String>,
    /// Overrides the registry's development flag.
    pub development: Option<bool>,
    pub host: Option<&'h dyn HostAdapter>,
}

impl<'h> RenderOptions<'h> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Params from a JSON object; anything else leaves the bag empty.
    #[must_use]
    pub fn params_value(mut self, params: Value) -> Self {
        self.params = match params {
            Value::Object(map) => map,
            _ => Params::new(),
        };
        self
    }

    #[must_use]
    pub fn id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn bearer(mut self, bearer: impl Into<String>) -> Self {
        self.bearer = Some(bearer.into());
        self
    }

    #[must_use]
    pub const fn development(mut self, development: bool) -> Self {
        self.development = Some(development);
        self
    }

    #[must_use]
    pub fn host(mut self, host: &'h dyn HostAdapter) -> Self {
        self.host = Some(host);
        self
    }
}

impl std::fmt::Debug for RenderOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("params", &self.params)
            .field("id", &self.id)
            .field("development", &self.development)
            .field("has_host", &self.host.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Class name for a path-style token: `v1/users` and `v1.users` both give
/// `V1::UsersApi`.
#[must_use]
pub fn class_name_for(token: &str) -> String {
    let segments: Vec<String> = token
        .split(['/', '.'])
        .filter(|s| !s.is_empty())
        .map(camelize)
        .collect();
    match segments.split_last() {
        Some((last, namespace)) => {
            let mut parts = namespace.to_vec();
            parts.push(format!("{last}Api"));
            parts.join("::")
        }
        None => String::new(),
    }
}

fn camelize(segment: &str) -> String {
    segment
        .split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}

/// Single-error envelope, for failures before any call exists.
#[must_use]
pub fn response_error(text: impl Into<String>) -> Envelope {
    Envelope::error(text)
}

impl Registry {
    /// Calls `action` on the class named `class`.
    ///
    /// Never fails: an unknown class or an empty action give error envelopes.
    pub fn render(&self, class: &str, spec: impl Into<ActionSpec>, opts: RenderOptions<'_>) -> Envelope {
        let spec = spec.into();
        let Some(resolved) = self.class(class) else {
            return response_error(format!("API class \"{class}\" not found"));
        };
        if spec.action().is_empty() {
            return response_error("Action not defined");
        }

        let RenderOptions {
            params,
            id,
            bearer,
            development,
            host,
        } = opts;

        let mut request = CallRequest::new(spec.action())
            .with_params(params)
            .with_development(development.unwrap_or(self.config.development))
            .with_method(host.map_or(Method::POST, |h| h.request_method()));
        if let Some(id) = spec.id().map(str::to_string).or(id) {
            request = request.with_id(id);
        }
        if let Some(bearer) = bearer {
            request = request.with_bearer(bearer);
        }

        dispatch::execute(self, resolved, request, host)
    }

    /// Like [`Registry::render`], with the class given as an exact name or a
    /// path-style token (`v1/users`).
    pub fn render_token(&self, token: &str, spec: impl Into<ActionSpec>, opts: RenderOptions<'_>) -> Envelope {
        if self.class(token).is_some() {
            return self.render(token, spec, opts);
        }
        self.render(&class_name_for(token), spec, opts)
    }

    /// Call-style adapter over [`Registry::render`] for one class.
    #[must_use]
    pub fn proxy<'a>(&'a self, class: &'a str) -> RenderProxy<'a> {
        RenderProxy { registry: self, class }
    }
}

/// `proxy.call("show", &[json!(1)])` renders member `show` with id 1;
/// `proxy.call("login", &[json!({"user": "foo"})])` renders collection
/// `login` with those params.
#[derive(Debug, Clone, Copy)]
pub struct RenderProxy<'a> {
    registry: &'a Registry,
    class: &'a str,
}

impl RenderProxy<'_> {
    /// The first non-object argument is the id, the next object the params.
    #[must_use]
    pub fn call(&self, action: &str, args: &[Value]) -> Envelope {
        let mut args = args.iter().peekable();
        let id = args.next_if(|a| !a.is_object()).map(id_text);
        let params = args.find_map(|a| a.as_object().cloned()).unwrap_or_default();

        let mut opts = RenderOptions::new().params(params);
        opts.id = id;
        self.registry.render(self.class, action, opts)
    }
}

fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

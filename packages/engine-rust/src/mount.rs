//! Auto-mount helper: maps an inbound host request to a call.
//!
//! Two request shapes are understood:
//!
//! * a path below the mount point, `{class_token}/{id?}/{action}`, with the
//!   query params as the params bag;
//! * a JSON body `{"class", "action", "params", "token"}`, where `action` is
//!   `"index"`, `"6/info"` or `[6, "info"]`.

use joshua_core::{Envelope, HostAdapter, Params, Value};
use serde::Deserialize;

use crate::error::ClassifyError;
use crate::registry::Registry;
use crate::resolver::{response_error, ActionSpec, RenderOptions};

const API_TOKEN_PARAM: &str = "api_token";

/// A classified inbound request, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct MountedCall {
    pub class: String,
    pub spec: ActionSpec,
    pub params: Params,
    /// Token found in the request itself (body, params or header).
    pub bearer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BodyAction {
    Text(String),
    Path(Vec<Value>),
}

#[derive(Debug, Deserialize)]
struct CallBody {
    class: Option<String>,
    action: Option<BodyAction>,
    #[serde(default)]
    params: Params,
    token: Option<String>,
}

/// Serves every class of a registry below one mount point.
#[derive(Debug, Clone)]
pub struct AutoMount<'a> {
    registry: &'a Registry,
    mount_on: String,
    bearer: Option<String>,
    development: Option<bool>,
}

impl<'a> AutoMount<'a> {
    /// Mounts on the registry's configured mount point.
    #[must_use]
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            mount_on: registry.config().mount_on.clone(),
            registry,
            bearer: None,
            development: None,
        }
    }

    #[must_use]
    pub fn mount_on(mut self, mount_on: impl Into<String>) -> Self {
        self.mount_on = mount_on.into();
        self
    }

    /// Bearer that beats anything found in the request.
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

    /// Classifies and renders one request. Always answers JSON.
    pub fn handle(&self, host: &dyn HostAdapter, path: &str, query: Params) -> Envelope {
        host.set_header("Content-Type", "application/json");

        let mounted = match self.classify(host, path, query) {
            Ok(mounted) => mounted,
            Err(err) => {
                tracing::debug!(%err, path, "request not classified");
                return response_error(err.to_string());
            }
        };

        let mut opts = RenderOptions::new().params(mounted.params).host(host);
        opts.bearer = self.bearer.clone().or(mounted.bearer);
        opts.development = self.development;

        self.registry.render_token(&mounted.class, mounted.spec, opts)
    }

    /// Reads the request into class, action, params and token.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the body can not be read or parsed, the
    /// path is outside the mount point, or no class is named.
    pub fn classify(&self, host: &dyn HostAdapter, path: &str, query: Params) -> Result<MountedCall, ClassifyError> {
        let body = host.read_body().map_err(ClassifyError::UnreadableBody)?;

        let mut mounted = if body.trim_start().starts_with('{') {
            Self::from_body(&body)?
        } else {
            self.from_path(path, query)?
        };

        mounted.bearer = mounted
            .bearer
            .take()
            .or_else(|| {
                mounted
                    .params
                    .get(API_TOKEN_PARAM)
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .or_else(|| bearer_from_header(host));

        Ok(mounted)
    }

    fn from_body(body: &str) -> Result<MountedCall, ClassifyError> {
        let body: CallBody = serde_json::from_str(body)?;
        let class = body
            .class
            .filter(|c| !c.is_empty())
            .ok_or(ClassifyError::MissingClass)?;

        let spec = match body.action {
            Some(BodyAction::Text(text)) => {
                let segments: Vec<&str> = text.split('/').filter(|s| !s.is_empty()).collect();
                ActionSpec::from_segments(&segments)
            }
            Some(BodyAction::Path(values)) => {
                let segments: Vec<String> = values.iter().map(segment_text).collect();
                ActionSpec::from_segments(&segments)
            }
            None => ActionSpec::from_segments::<&str>(&[]),
        };

        Ok(MountedCall {
            class,
            spec,
            params: body.params,
            bearer: body.token,
        })
    }

    fn from_path(&self, path: &str, query: Params) -> Result<MountedCall, ClassifyError> {
        let path = path.split('?').next().unwrap_or_default();
        let prefix = self.mount_on.trim_end_matches('/');

        let rest = path
            .strip_prefix(prefix)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .ok_or_else(|| ClassifyError::OutsideMount {
                path: path.to_string(),
                mount_on: self.mount_on.clone(),
            })?;

        let mut segments = rest.split('/').filter(|s| !s.is_empty());
        let class = segments
            .next()
            .map(str::to_string)
            .ok_or(ClassifyError::MissingClass)?;
        let segments: Vec<&str> = segments.collect();

        Ok(MountedCall {
            class,
            spec: ActionSpec::from_segments(&segments),
            params: query,
            bearer: None,
        })
    }
}

fn segment_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn bearer_from_header(host: &dyn HostAdapter) -> Option<String> {
    let header = host.authorization()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

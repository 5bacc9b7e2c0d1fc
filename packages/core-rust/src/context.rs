use http::Method;
use uuid::Uuid;

use crate::types::{Params, Scope};

/// Per-call context: what was asked for, by whom, with which raw params.
/// Created once per dispatch and never shared between calls.
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// Action name as requested.
    pub action: String,
    /// Member id; its presence selects member scope.
    pub id: Option<String>,
    /// Raw params bag, before validation.
    pub params: Params,
    /// Opaque bearer token, passed through to hooks untouched.
    pub bearer: Option<String>,
    /// Development mode: relaxes HTTP admission.
    pub development: bool,
    /// Request method reported by the host; POST when there is no host.
    pub method: Method,
    /// Unique id of this call, for tracing.
    pub uid: Uuid,
}

impl CallRequest {
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            id: None,
            params: Params::new(),
            bearer: None,
            development: false,
            method: Method::POST,
            uid: Uuid::new_v4(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_bearer(mut self, bearer: impl Into<String>) -> Self {
        self.bearer = Some(bearer.into());
        self
    }

    #[must_use]
    pub fn with_development(mut self, development: bool) -> Self {
        self.development = development;
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub const fn scope(&self) -> Scope {
        Scope::for_id(self.id.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_collection_post() {
        let req = CallRequest::new("index");
        assert_eq!(req.scope(), Scope::Collection);
        assert_eq!(req.method, Method::POST);
        assert!(!req.development);
    }

    #[test]
    fn id_selects_member_scope() {
        assert_eq!(CallRequest::new("show").with_id("1").scope(), Scope::Member);
    }

    #[test]
    fn every_call_gets_its_own_uid() {
        assert_ne!(CallRequest::new("a").uid, CallRequest::new("a").uid);
    }
}

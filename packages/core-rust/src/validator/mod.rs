//! Params validator: coerces raw values against a [`ParamSchema`].
//!
//! Validation failures are values ([`CheckError::Invalid`]) and are collected
//! per field; configuration problems ([`CheckError::Config`]) abort the call.

mod checkers;
pub mod locale;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use thiserror::Error;

use crate::schema::{ParamOpts, ParamSchema, ParamType};
use crate::types::{is_blank, value_to_text, Params, Value};

pub use locale::{Locale, Messages};

/// Failure of a single check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// The value does not satisfy its type; reported as a field error.
    #[error("{0}")]
    Invalid(String),
    /// The schema itself is broken (unknown type or model, malformed bound).
    #[error("configuration error: {0}")]
    Config(String),
}

/// User-supplied checker for a custom type. `Err` carries the validation
/// message.
pub type CustomCheck = Arc<dyn Fn(&Value, &ParamOpts) -> Result<Value, String> + Send + Sync>;

/// Post-process hook of a model, run on the coerced field map.
pub type ModelHook = Arc<dyn Fn(&mut Params) -> Result<(), String> + Send + Sync>;

/// Named nested schema used by `model` params.
#[derive(Clone)]
pub struct Model {
    pub schema: ParamSchema,
    pub hook: Option<ModelHook>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("schema", &self.schema)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// Result of validating a whole params bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
    /// Raw params with every declared field replaced by its coerced value.
    /// Declared fields that resolved to nothing are removed.
    pub params: Params,
    /// `(field, message)` pairs in schema order.
    pub errors: Vec<(String, String)>,
}

const DEFAULT_DELIMITER: &str = r"\s*[,:;]\s*";

/// Default split for array params without an explicit delimiter.
fn default_delimiter() -> Result<&'static Regex, CheckError> {
    static DELIMITER: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    DELIMITER
        .get_or_init(|| Regex::new(DEFAULT_DELIMITER))
        .as_ref()
        .map_err(|err| CheckError::Config(format!("array delimiter: {err}")))
}

/// Type checker registry plus message locale.
#[derive(Clone, Default)]
pub struct Validator {
    locale: Locale,
    types: HashMap<String, CustomCheck>,
    models: HashMap<String, Model>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.types.keys().collect();
        types.sort();
        f.debug_struct("Validator")
            .field("locale", &self.locale)
            .field("types", &types)
            .field("models", &self.models)
            .finish()
    }
}

impl Validator {
    #[must_use]
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    #[must_use]
    pub const fn messages(&self) -> &'static Messages {
        self.locale.messages()
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// Registers (or replaces) a custom type checker.
    pub fn register_type<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&Value, &ParamOpts) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.types.insert(name.into(), Arc::new(check));
    }

    /// Registers (or replaces) a named model.
    pub fn register_model(&mut self, name: impl Into<String>, schema: ParamSchema, hook: Option<ModelHook>) {
        self.models.insert(name.into(), Model { schema, hook });
    }

    #[must_use]
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    #[must_use]
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Every custom type and model referenced by `schema` that is not
    /// registered, as configuration errors.
    #[must_use]
    pub fn unresolved(&self, schema: &ParamSchema) -> Vec<CheckError> {
        schema
            .types()
            .filter_map(|ty| match ty {
                ParamType::Custom(name) if !self.has_type(name) => {
                    Some(CheckError::Config(format!("unsupported param type: {name}")))
                }
                ParamType::Model(name) if !self.models.contains_key(name) => {
                    Some(CheckError::Config(format!("model not found: {name}")))
                }
                _ => None,
            })
            .collect()
    }

    /// Checks one raw value.
    ///
    /// Blank input resolves to the coerced default, else fails with
    /// "Argument missing" when required, else resolves to `None`.
    ///
    /// # Errors
    ///
    /// [`CheckError::Invalid`] for a value that fails its type,
    /// [`CheckError::Config`] for an unusable schema.
    pub fn check(&self, ty: &ParamType, raw: Option<&Value>, opts: &ParamOpts) -> Result<Option<Value>, CheckError> {
        let m = self.messages();
        match raw {
            Some(value) if !is_blank(Some(value)) => self.coerce(ty, value, opts).map(Some),
            _ => match &opts.default {
                Some(default) => self.coerce(ty, default, opts).map(Some),
                None if opts.required => Err(CheckError::Invalid(m.argument_missing.to_string())),
                None => Ok(None),
            },
        }
    }

    /// Validates every declared field of `schema` against `raw`.
    ///
    /// # Errors
    ///
    /// Only [`CheckError::Config`]; field failures land in
    /// [`Validated::errors`].
    pub fn validate(&self, schema: &ParamSchema, raw: &Params) -> Result<Validated, CheckError> {
        let mut out = Validated {
            params: raw.clone(),
            errors: Vec::new(),
        };

        for field in schema.fields() {
            match self.check(&field.ty, raw.get(&field.name), &field.opts) {
                Ok(Some(value)) => {
                    out.params.insert(field.name.clone(), value);
                }
                Ok(None) => {
                    out.params.shift_remove(&field.name);
                }
                Err(CheckError::Invalid(message)) => {
                    tracing::debug!(field = %field.name, %message, "param rejected");
                    out.errors.push((field.name.clone(), message));
                }
                Err(err @ CheckError::Config(_)) => return Err(err),
            }
        }

        Ok(out)
    }

    fn coerce(&self, ty: &ParamType, raw: &Value, opts: &ParamOpts) -> Result<Value, CheckError> {
        if !opts.array {
            return self.check_one(ty, raw, opts);
        }

        let items: Vec<Value> = match raw {
            Value::Array(items) => items.clone(),
            other => {
                let text = value_to_text(other);
                let mut parts: Vec<&str> = match &opts.delimiter {
                    Some(delimiter) => text.split(delimiter.as_str()).collect(),
                    None => default_delimiter()?.split(&text).collect(),
                };
                // "1,2," is two items
                while parts.last().is_some_and(|p| p.is_empty()) {
                    parts.pop();
                }
                parts.into_iter().map(|p| Value::String(p.to_string())).collect()
            }
        };

        let mut out: Vec<Value> = Vec::with_capacity(items.len());
        for item in &items {
            let value = self.check_one(ty, item, opts)?;
            if opts.no_duplicates && out.contains(&value) {
                continue;
            }
            out.push(value);
        }
        Ok(Value::Array(out))
    }

    fn check_one(&self, ty: &ParamType, value: &Value, opts: &ParamOpts) -> Result<Value, CheckError> {
        let m = self.messages();
        let result = match ty {
            ParamType::Boolean => checkers::boolean(value, m)?,
            ParamType::Integer => checkers::integer(value, opts, m)?,
            ParamType::Float => checkers::float(value, opts, m)?,
            ParamType::String => checkers::string(value),
            ParamType::Date => checkers::date(value, opts, m)?,
            ParamType::DateTime => checkers::date_time(value, opts, m)?,
            ParamType::Hash => checkers::hash(value, opts),
            ParamType::Email => checkers::email(value, m)?,
            ParamType::Url => checkers::url(value, m)?,
            ParamType::Point => checkers::point(value, m)?,
            ParamType::Oib => checkers::oib(value, m)?,
            ParamType::Model(name) => self.check_model(name, value)?,
            ParamType::Custom(name) => {
                let check = self
                    .types
                    .get(name)
                    .ok_or_else(|| CheckError::Config(format!("unsupported param type: {name}")))?;
                check(value, opts).map_err(CheckError::Invalid)?
            }
        };

        if let Some(values) = &opts.values {
            if !values.contains(&result) {
                return Err(CheckError::Invalid(m.not_in_range.to_string()));
            }
        }
        Ok(result)
    }

    /// Output holds exactly the declared fields; absent ones are null.
    fn check_model(&self, name: &str, value: &Value) -> Result<Value, CheckError> {
        let model = self
            .models
            .get(name)
            .ok_or_else(|| CheckError::Config(format!("model not found: {name}")))?;
        let Value::Object(input) = value else {
            return Err(CheckError::Invalid(self.messages().bad_format.to_string()));
        };

        let mut out = Params::new();
        for field in model.schema.fields() {
            let coerced = match self.check(&field.ty, input.get(&field.name), &field.opts) {
                Ok(v) => v,
                Err(CheckError::Invalid(message)) => {
                    return Err(CheckError::Invalid(format!("{message} ({})", field.name)));
                }
                Err(err) => return Err(err),
            };
            out.insert(field.name.clone(), coerced.unwrap_or(Value::Null));
        }

        if let Some(hook) = &model.hook {
            hook(&mut out).map_err(CheckError::Invalid)?;
        }
        Ok(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::schema::SchemaBuilder;

    fn opts() -> ParamOpts {
        ParamOpts::default()
    }

    fn optional() -> ParamOpts {
        let mut o = ParamOpts::default();
        o.optional();
        o
    }

    fn missing() -> CheckError {
        CheckError::Invalid("Argument missing".into())
    }

    // ---- blank handling ----

    #[test]
    fn required_blank_fails() {
        let v = Validator::default();
        assert_eq!(v.check(&ParamType::String, None, &opts()), Err(missing()));
        assert_eq!(v.check(&ParamType::String, Some(&json!("")), &opts()), Err(missing()));
        assert_eq!(v.check(&ParamType::String, Some(&Value::Null), &opts()), Err(missing()));
    }

    #[test]
    fn optional_blank_is_absent() {
        let v = Validator::default();
        assert_eq!(v.check(&ParamType::Integer, Some(&json!("")), &optional()), Ok(None));
    }

    #[test]
    fn default_applies_even_when_required() {
        let v = Validator::default();
        let mut o = opts();
        o.default_to("5");
        assert_eq!(v.check(&ParamType::Integer, None, &o), Ok(Some(json!(5))));
    }

    #[test]
    fn locale_switches_messages() {
        let v = Validator::new(Locale::Hr);
        assert_eq!(
            v.check(&ParamType::String, None, &opts()),
            Err(CheckError::Invalid("Argument nedostaje".into()))
        );
    }

    // ---- arrays ----

    #[test]
    fn array_splits_on_default_separators() {
        let v = Validator::default();
        let mut o = opts();
        o.array();
        assert_eq!(
            v.check(&ParamType::Integer, Some(&json!("1, 2;3 : 4")), &o),
            Ok(Some(json!([1, 2, 3, 4])))
        );
    }

    #[test]
    fn array_drops_trailing_empty_segments() {
        let v = Validator::default();
        let mut o = opts();
        o.array();
        assert_eq!(
            v.check(&ParamType::Integer, Some(&json!("1,2,")), &o),
            Ok(Some(json!([1, 2])))
        );
        assert_eq!(
            v.check(&ParamType::Integer, Some(&json!("1, 2 ; ")), &o),
            Ok(Some(json!([1, 2])))
        );

        o.delimiter("|");
        assert_eq!(
            v.check(&ParamType::Integer, Some(&json!("3|4||")), &o),
            Ok(Some(json!([3, 4])))
        );
    }

    #[test]
    fn default_delimiter_compiles() {
        let re = default_delimiter().unwrap();
        assert_eq!(re.split("a , b;c").collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn array_custom_delimiter_and_dedupe() {
        let v = Validator::default();
        let mut o = opts();
        o.delimiter("|").no_duplicates();
        assert_eq!(
            v.check(&ParamType::String, Some(&json!("b|a|b|c|a")), &o),
            Ok(Some(json!(["b", "a", "c"])))
        );
    }

    #[test]
    fn array_input_is_checked_per_element() {
        let v = Validator::default();
        let mut o = opts();
        o.array().values([1, 2]);
        assert_eq!(v.check(&ParamType::Integer, Some(&json!(["1", 2])), &o), Ok(Some(json!([1, 2]))));
        assert_eq!(
            v.check(&ParamType::Integer, Some(&json!([1, 3])), &o),
            Err(CheckError::Invalid("Value not in range of values".into()))
        );
    }

    // ---- values / custom / unknown ----

    #[test]
    fn values_membership() {
        let v = Validator::default();
        let mut o = opts();
        o.values(["red", "green"]);
        assert_eq!(v.check(&ParamType::String, Some(&json!(" red ")), &o), Ok(Some(json!("red"))));
        assert!(v.check(&ParamType::String, Some(&json!("blue")), &o).is_err());
    }

    #[test]
    fn custom_type_runs_registered_checker() {
        let mut v = Validator::default();
        v.register_type("label", |value, _| {
            let text = value_to_text(value);
            if text.len() > 3 {
                Ok(Value::String(text.to_uppercase()))
            } else {
                Err("Label too short".to_string())
            }
        });
        let label = ParamType::Custom("label".into());
        assert_eq!(v.check(&label, Some(&json!("acme")), &opts()), Ok(Some(json!("ACME"))));
        assert_eq!(
            v.check(&label, Some(&json!("ab")), &opts()),
            Err(CheckError::Invalid("Label too short".into()))
        );
    }

    #[test]
    fn unknown_type_is_configuration_error() {
        let v = Validator::default();
        let ty = ParamType::Custom("nope".into());
        assert!(matches!(v.check(&ty, Some(&json!("x")), &opts()), Err(CheckError::Config(_))));
    }

    #[test]
    fn unresolved_lists_missing_types_and_models() {
        let mut s = SchemaBuilder::new();
        s.field("a", "nope");
        s.field("b", ParamType::model("company"));
        s.field("c", ParamType::Integer);
        let schema = s.finish().unwrap();
        assert_eq!(Validator::default().unresolved(&schema).len(), 2);
    }

    // ---- models ----

    fn company_validator(with_hook: bool) -> Validator {
        let mut s = SchemaBuilder::new();
        s.field("name", ParamType::String);
        s.field("oib?", ParamType::Oib);
        let hook: Option<ModelHook> = with_hook.then(|| {
            Arc::new(|out: &mut Params| {
                if out.get("name") == Some(&json!("forbidden")) {
                    return Err("Name not allowed".to_string());
                }
                out.insert("name".into(), json!("ACME corp"));
                Ok(())
            }) as ModelHook
        });
        let mut v = Validator::default();
        v.register_model("company", s.finish().unwrap(), hook);
        v
    }

    #[test]
    fn model_strips_undeclared_and_nulls_absent() {
        let v = company_validator(false);
        let out = v
            .check(&ParamType::model("company"), Some(&json!({ "name": " acme ", "extra": 1 })), &opts())
            .unwrap();
        assert_eq!(out, Some(json!({ "name": "acme", "oib": null })));
    }

    #[test]
    fn model_field_errors_carry_field_name() {
        let v = company_validator(false);
        assert_eq!(
            v.check(&ParamType::model("company"), Some(&json!({ "oib": "1" })), &opts()),
            Err(CheckError::Invalid("Argument missing (name)".into()))
        );
    }

    #[test]
    fn model_hook_post_processes() {
        let v = company_validator(true);
        let ty = ParamType::model("company");
        assert_eq!(
            v.check(&ty, Some(&json!({ "name": "x" })), &opts()),
            Ok(Some(json!({ "name": "ACME corp", "oib": null })))
        );
        assert_eq!(
            v.check(&ty, Some(&json!({ "name": "forbidden" })), &opts()),
            Err(CheckError::Invalid("Name not allowed".into()))
        );
    }

    // ---- whole bag ----

    #[test]
    fn validate_collects_every_field_error() {
        let mut s = SchemaBuilder::new();
        s.field("foo", ParamType::String);
        s.field("bar", ParamType::Integer);
        s.field("page?", ParamType::Integer).default_to(1);
        let schema = s.finish().unwrap();

        let raw = json!({ "bar": "x", "keep": "me" });
        let Value::Object(raw) = raw else { unreachable!() };
        let out = Validator::default().validate(&schema, &raw).unwrap();

        assert_eq!(
            out.errors,
            vec![
                ("foo".to_string(), "Argument missing".to_string()),
                ("bar".to_string(), "Not an integer".to_string()),
            ]
        );
        assert_eq!(out.params.get("page"), Some(&json!(1)));
        assert_eq!(out.params.get("keep"), Some(&json!("me")));
    }

    // ---- properties ----

    proptest! {
        #[test]
        fn integer_text_round_trips(n in any::<i64>()) {
            let v = Validator::default();
            let got = v.check(&ParamType::Integer, Some(&json!(n.to_string())), &opts()).unwrap();
            prop_assert_eq!(got, Some(json!(n)));
        }

        #[test]
        fn checks_are_idempotent(s in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,19}", n in -10_000i64..10_000) {
            let v = Validator::default();
            for (ty, raw) in [(ParamType::String, json!(s.clone())), (ParamType::Integer, json!(n))] {
                if let Ok(Some(first)) = v.check(&ty, Some(&raw), &opts()) {
                    let second = v.check(&ty, Some(&first), &opts()).unwrap();
                    prop_assert_eq!(second, Some(first));
                }
            }
        }
    }
}

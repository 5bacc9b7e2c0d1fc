//! Param validation as seen through dispatch.

mod common;

use common::{fixture, fixture_with, params};
use joshua_engine::{EngineConfig, Locale, RenderOptions};
use serde_json::json;

#[test]
fn required_params_pass() {
    let f = fixture();
    let env = f.registry.render(
        "GenericApi",
        "param_test_2",
        RenderOptions::new().params(params(json!({ "foo": "test" }))),
    );
    assert!(env.success);
    assert_eq!(env.data, Some(json!({ "foo": "test", "abc": "baz" })));
}

#[test]
fn defaults_can_be_overridden() {
    let f = fixture();
    let env = f.registry.render(
        "GenericApi",
        "param_test_2",
        RenderOptions::new().params(params(json!({ "foo": "test", "abc": "custom", "bar": "42" }))),
    );
    let data = env.data.unwrap_or_default();
    assert_eq!(data["abc"], json!("custom"));
    assert_eq!(data["bar"], json!(42));
}

#[test]
fn missing_required_param() {
    let f = fixture();
    let env = f.registry.render(
        "GenericApi",
        "param_test_2",
        RenderOptions::new().params(params(json!({ "abc": "value" }))),
    );
    assert!(!env.success);
    assert_eq!(env.status, 400);
    assert_eq!(env.messages(), ["Argument missing (foo)"]);
    assert_eq!(env.error.as_ref().and_then(|e| e.detail("foo")), Some("Argument missing"));
}

#[test]
fn every_bad_field_gets_a_detail() {
    let f = fixture();
    let env = f.registry.render(
        "GenericApi",
        "param_test_2",
        RenderOptions::new().params(params(json!({ "bar": "12.5" }))),
    );
    let error = env.error.unwrap_or_default();
    assert_eq!(error.detail("foo"), Some("Argument missing"));
    assert_eq!(error.detail("bar"), Some("Not an integer"));
    assert_eq!(error.messages.len(), 2);
}

#[test]
fn custom_type_arrays() {
    let f = fixture();
    let env = f.registry.render(
        "GenericApi",
        "list_labels",
        RenderOptions::new().params(params(json!({
            "labels_dup": "A, b ,a",
            "labels_nodup": ["A", "b", "a"]
        }))),
    );
    assert!(env.success);
    let data = env.data.unwrap_or_default();
    assert_eq!(data["labels_dup"], json!(["a", "b", "a"]));
    assert_eq!(data["labels_nodup"], json!(["a", "b"]));
}

#[test]
fn custom_type_rejection() {
    let f = fixture();
    let env = f.registry.render(
        "GenericApi",
        "list_labels",
        RenderOptions::new().params(params(json!({ "labels_dup": [1] }))),
    );
    assert_eq!(
        env.error.as_ref().and_then(|e| e.detail("labels_dup")),
        Some("Label must be text")
    );
}

#[test]
fn boolean_flags() {
    let f = fixture();
    let env = f.registry.render(
        "UserApi",
        (1_i64, "creator"),
        RenderOptions::new().params(params(json!({ "show_all": "maybe" }))),
    );
    assert_eq!(
        env.error.as_ref().and_then(|e| e.detail("show_all")),
        Some("Unsupported boolean param value: maybe")
    );

    let env = f.registry.render(
        "UserApi",
        (1_i64, "creator"),
        RenderOptions::new().params(params(json!({ "show_all": "on" }))),
    );
    assert!(env.success);
}

#[test]
fn undeclared_params_pass_through() {
    let f = fixture();
    let env = f.registry.render(
        "GenericApi",
        "param_test_2",
        RenderOptions::new().params(params(json!({ "foo": " padded ", "extra": 1 }))),
    );
    let data = env.data.unwrap_or_default();
    assert_eq!(data["foo"], json!("padded"));
    assert_eq!(data["extra"], json!(1));
}

#[test]
fn localized_messages() {
    let config = EngineConfig {
        locale: Locale::Hr,
        ..EngineConfig::default()
    };
    let f = fixture_with(config, |_| {});
    let env = f.registry.render("GenericApi", "param_test_2", RenderOptions::new());
    assert_eq!(env.error.as_ref().and_then(|e| e.detail("foo")), Some("Argument nedostaje"));
}

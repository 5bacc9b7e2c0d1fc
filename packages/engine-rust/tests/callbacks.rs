//! Hook order, after_all as the ensure stage, and error routing.

mod common;

use common::{fixture, fixture_with};
use joshua_engine::{EngineConfig, ErrorCode, RenderOptions};
use serde_json::json;

#[test]
fn hooks_run_root_to_leaf() {
    let f = fixture();
    let env = f.registry.render("CompanyApi", (1_i64, "show"), RenderOptions::new());
    assert!(env.success);
    assert_eq!(
        f.log(),
        [
            "ApplicationApi before_all",
            "ModelApi before_all",
            "ModelApi before_member",
            "ModelApi after_member",
            "ApplicationApi after_all",
        ]
    );
}

#[test]
fn after_all_runs_when_member_hook_fails() {
    let f = fixture();
    let env = f.registry.render("CompanyApi", (999_i64, "show"), RenderOptions::new());
    assert!(!env.success);
    assert_eq!(env.meta.get("ip"), Some(&json!("1.2.3.4")));
    assert_eq!(
        f.log(),
        [
            "ApplicationApi before_all",
            "ModelApi before_all",
            "ModelApi before_member",
            "ApplicationApi after_all",
        ]
    );
}

#[test]
fn after_all_runs_on_validation_failure() {
    let f = fixture();
    let env = f.registry.render("GenericApi", "param_test_2", RenderOptions::new());
    assert!(!env.success);
    assert_eq!(f.log(), ["ApplicationApi after_all"]);
    assert_eq!(env.meta.get("ip"), Some(&json!("1.2.3.4")));
}

#[test]
fn named_error_by_code() {
    let f = fixture();
    let env = f.registry.render("GenericApi", "get_money", RenderOptions::new());
    assert!(!env.success);
    assert_eq!(env.messages(), ["$ not found"]);
    assert_eq!(env.status, 400);
    assert_eq!(env.error.and_then(|e| e.code), Some(ErrorCode::Number(405)));
}

#[test]
fn named_error_by_symbol() {
    let f = fixture();
    let env = f.registry.render("GenericApi", "named_error_test", RenderOptions::new());
    assert_eq!(env.messages(), ["Named error example"]);
}

#[test]
fn named_handler_can_recover() {
    let f = fixture_with(EngineConfig::default(), |b| {
        b.rescue_from_with("named_error", |call| {
            call.response().message("recovered").data(json!("fallback"));
        });
    });
    let env = f.registry.render("GenericApi", "named_error_test", RenderOptions::new());
    assert!(env.success);
    assert_eq!(env.status, 200);
    assert_eq!(env.message.as_deref(), Some("recovered"));
    assert_eq!(env.data, Some(json!("fallback")));
    assert!(env.error.is_none());
    assert_eq!(env.meta.get("ip"), Some(&json!("1.2.3.4")));
}

#[test]
fn named_handler_sets_its_own_error() {
    let f = fixture_with(EngineConfig::default(), |b| {
        b.rescue_from_with(405, |call| {
            call.response().error("Payment required").status(402);
        });
    });
    let env = f.registry.render("GenericApi", "get_money", RenderOptions::new());
    assert!(!env.success);
    assert_eq!(env.messages(), ["Payment required"]);
    assert_eq!(env.status, 402);
    assert!(f.sink.reports().is_empty());
}

#[test]
fn rescue_all_handles_unhandled_errors() {
    let f = fixture();
    let env = f.registry.render("GenericApi", "about", RenderOptions::new());
    assert!(!env.success);
    assert_eq!(env.status, 500);
    assert_eq!(env.messages(), ["Error happens"]);
    assert_eq!(
        f.sink.reports(),
        ["GenericApi#about: undefined local variable `xxx`"]
    );
    assert_eq!(env.meta.get("ip"), Some(&json!("1.2.3.4")));
}

#[test]
fn panics_are_contained() {
    let f = fixture();
    let env = f.registry.render("GenericApi", "panic_test", RenderOptions::new());
    assert!(!env.success);
    assert_eq!(env.status, 500);
    assert_eq!(env.messages(), ["Error happens"]);
    assert_eq!(f.sink.reports(), ["GenericApi#panic_test: panic: handler exploded"]);
}

#[test]
fn generic_internal_error_without_handlers() {
    let f = fixture_with(EngineConfig::default(), |b| {
        b.class("BareApi", None, |c| {
            c.collection(|c| {
                c.def("boom", |_| Err(anyhow::anyhow!("db down").into()));
                c.def("explode", |_| panic!("kaboom"));
            });
        });
    });

    // rescue_all is registry-wide, so BareApi is rescued too
    let env = f.registry.render("BareApi", "boom", RenderOptions::new());
    assert_eq!(env.messages(), ["Error happens"]);

    let mut b = joshua_engine::Registry::builder();
    b.config(EngineConfig {
        suppress_diagnostics: true,
        ..EngineConfig::default()
    });
    b.class("BareApi", None, |c| {
        c.collection(|c| {
            c.def("boom", |_| Err(anyhow::anyhow!("db down").into()));
            c.def("explode", |_| panic!("kaboom"));
        });
    });
    let registry = b.build().unwrap();

    let env = registry.render("BareApi", "boom", RenderOptions::new());
    assert_eq!(env.messages(), ["Internal server error"]);
    assert_eq!(env.status, 500);
    assert_eq!(env.error.and_then(|e| e.code), Some(ErrorCode::from("InternalError")));

    let env = registry.render("BareApi", "explode", RenderOptions::new());
    assert_eq!(env.messages(), ["Internal server error"]);
    assert_eq!(env.error.and_then(|e| e.code), Some(ErrorCode::from("Panic")));
}

#[test]
fn rescue_by_error_kind() {
    #[derive(Debug, thiserror::Error)]
    #[error("quota exceeded")]
    struct QuotaError;

    let f = fixture_with(EngineConfig::default(), |b| {
        b.rescue_kind::<QuotaError, _>(|call, err| {
            call.response().error(format!("Try later: {err}"));
            call.response().status(429);
        });
        b.class("QuotaApi", None, |c| {
            c.collection(|c| {
                c.def("use", |_| Err(joshua_engine::DispatchError::unhandled(QuotaError)));
            });
        });
    });

    let env = f.registry.render("QuotaApi", "use", RenderOptions::new());
    assert_eq!(env.messages(), ["Try later: quota exceeded"]);
    assert_eq!(env.status, 429);
}

#[test]
fn suppressed_diagnostics() {
    let config = EngineConfig {
        suppress_diagnostics: true,
        ..EngineConfig::default()
    };
    let f = fixture_with(config, |_| {});
    let env = f.registry.render("GenericApi", "about", RenderOptions::new());
    assert_eq!(env.status, 500);
    assert!(f.sink.reports().is_empty());
}

#[test]
fn controlled_errors_do_not_reach_the_sink() {
    let f = fixture();
    f.registry.render("GenericApi", "get_money", RenderOptions::new());
    f.registry.render("CompanyApi", (999_i64, "show"), RenderOptions::new());
    assert!(f.sink.reports().is_empty());
}

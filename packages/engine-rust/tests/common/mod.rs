//! Shared fixture registry for integration tests.
//!
//! Class tree:
//!
//! ```text
//! ApplicationApi
//! ├── ModelApi
//! │   ├── CompanyApi
//! │   └── UserApi
//! └── GenericApi
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use joshua_core::ErrorOptions;
use joshua_engine::{
    Call, ClassBuilder, CollectingSink, EngineConfig, Params, Registry, RegistryBuilder, Value,
};
use parking_lot::Mutex;
use serde_json::json;

/// Records hook execution order across one test.
pub type OrderLog = Arc<Mutex<Vec<String>>>;

/// Object loaded by the member before hook of `ModelApi`.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub name: String,
}

#[derive(Debug, Clone, Copy)]
struct Number(i64);

#[derive(Debug, Clone, Copy)]
struct AnonymousOk(i64);

pub struct Fixture {
    pub registry: Registry,
    pub log: OrderLog,
    pub sink: CollectingSink,
}

impl Fixture {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

/// JSON object literal as a params bag.
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// Fixture registry with the default config.
pub fn fixture() -> Fixture {
    fixture_with(EngineConfig::default(), |_| {})
}

/// Fixture registry; `extend` may register more classes before the build.
pub fn fixture_with(config: EngineConfig, extend: impl FnOnce(&mut RegistryBuilder)) -> Fixture {
    let log = OrderLog::default();
    let sink = CollectingSink::new();

    let mut builder = RegistryBuilder::new(config);
    builder.diagnostics(Arc::new(sink.clone()));
    declare_all(&mut builder, &log);
    extend(&mut builder);

    let registry = match builder.build() {
        Ok(registry) => registry,
        Err(err) => panic!("fixture registry failed to build: {err}"),
    };

    Fixture { registry, log, sink }
}

fn declare_all(b: &mut RegistryBuilder, log: &OrderLog) {
    b.rescue_from(405, "$ not found");
    b.rescue_from("named_error", "Named error example");
    b.rescue_all(|call, _err| {
        call.response()
            .error_with("Error happens", ErrorOptions::default().status(500));
    });

    b.annotation("anonymous", |call, _args| {
        call.insert(AnonymousOk(12345));
        Ok(())
    });
    b.annotation("require_role", |call, args| {
        let role = args.first().and_then(Value::as_str).unwrap_or_default();
        if call.bearer() == Some(role) {
            Ok(())
        } else {
            Err(call.error(format!("Role {role} required")))
        }
    });

    b.param_type("label", |value, _opts| {
        value
            .as_str()
            .map(|s| Value::String(s.trim().to_lowercase()))
            .ok_or_else(|| "Label must be text".to_string())
    });

    b.model("user", |m| {
        m.field("name", "string");
        m.field("email", "email");
        m.field("is_admin?", "boolean");
    });
    b.model("company", |m| {
        m.field("name", "string");
        m.field("address?", "string");
        m.field("oib?", "oib");
    });

    b.plugin("test_1", |c| {
        c.collection(|c| {
            c.def("plugin_test", |_| Ok(json!("from_plugin")));
        });
    });

    application_api(b, log);
    model_api(b, log);
    company_api(b);
    user_api(b);
    generic_api(b);
}

fn logger(log: &OrderLog, entry: &'static str) -> impl Fn(&mut Call<'_>) -> Result<(), joshua_engine::DispatchError> {
    let log = Arc::clone(log);
    move |_| {
        log.lock().push(entry.to_string());
        Ok(())
    }
}

fn application_api(b: &mut RegistryBuilder, log: &OrderLog) {
    let before = logger(log, "ApplicationApi before_all");
    let after_log = Arc::clone(log);
    b.class("ApplicationApi", None, move |c| {
        c.before(before);
        c.after(move |call| {
            after_log.lock().push("ApplicationApi after_all".to_string());
            call.meta("ip", "1.2.3.4");
            Ok(())
        });
    });
}

fn model_api(b: &mut RegistryBuilder, log: &OrderLog) {
    let before_all = logger(log, "ModelApi before_all");
    let member_log = Arc::clone(log);
    let after_member = logger(log, "ModelApi after_member");
    b.class("ModelApi", Some("ApplicationApi"), move |c| {
        c.before(before_all);
        c.collection(|c| {
            c.def("call_me_in_child", |call| {
                call.insert(Number(2345));
                Ok(json!(2345))
            });
        });

        c.member(move |c| {
            c.before(move |call| {
                member_log.lock().push("ModelApi before_member".to_string());
                if call.id_i64() == Some(1) {
                    call.insert(LoadedModel {
                        name: "ACME corp".to_string(),
                    });
                    Ok(())
                } else {
                    Err(call.error("Model not found"))
                }
            });
            c.after(after_member);

            c.desc("Show object creator");
            c.params(|p| {
                p.flag("show_all", false);
            });
            c.def("creator", |_| Ok(json!("@dux")));

            c.desc("Update the model");
            c.def("update", |_| Ok(json!("updated")));

            c.def("call_me_in_child", |call| {
                call.insert(Number(1234));
                Ok(json!(1234))
            });
        });
    });
}

fn model_name(call: &Call<'_>) -> Value {
    call.get::<LoadedModel>()
        .map_or(Value::Null, |m| Value::String(m.name.clone()))
}

fn company_api(b: &mut RegistryBuilder) {
    b.class("CompanyApi", Some("ModelApi"), |c| {
        c.desc("Companies");
        c.icon("<path d=\"M21,7h-6\"/>");

        c.collection(|c| {
            c.params(|p| {
                p.optional("country_id", "integer");
                p.flag("is_active", false);
            });
            c.allow("put");
            c.desc("List of available companies");
            c.def("index", |call| {
                call.message("done");
                Ok(Value::Null)
            });

            c.def("info", |_| Ok(json!({ "countries_in_index": 123 })));
        });

        c.member(|c| {
            c.desc("Simple index");
            c.params(|p| {
                p.flag("is_active", false);
                p.optional("country", "string");
            });
            c.def("index", |call| {
                call.message("all ok");
                Ok(model_name(call))
            });

            c.def("show", |call| Ok(model_name(call)));

            c.params(|p| {
                p.field("company", "model:company");
            });
            c.def("update", |call| Ok(call.param("company").cloned().unwrap_or_default()));
        });
    });
}

fn user_api(b: &mut RegistryBuilder) {
    b.class("UserApi", Some("ModelApi"), |c| {
        c.desc("User related operations");

        c.collection(|c| {
            c.annotate("anonymous", Vec::<Value>::new());
            c.mark_unsafe();
            c.detail("For demo purposes, use user=foo and pass=bar");
            c.params(|p| {
                p.field("user", "string");
                p.field("pass", "string");
            });
            c.def("login", |call| {
                let user = call.param("user").and_then(Value::as_str);
                let pass = call.param("pass").and_then(Value::as_str);
                if user == Some("foo") && pass == Some("bar") {
                    Ok(json!("login ok"))
                } else {
                    Err(call.error("Wrong user & pass"))
                }
            });

            c.allow("delete");
            c.def("call_me_in_child", |call| {
                let parent = call.super_call()?;
                Ok(json!(parent.as_i64().unwrap_or_default() * 2))
            });
        });

        c.member(|c| {
            c.params(|p| {
                p.field("user", "model:user");
            });
            c.def("update", |call| Ok(call.param("user").cloned().unwrap_or_default()));

            c.def("call_me_in_child", |call| {
                call.super_call()?;
                let Number(n) = call.get::<Number>().copied().unwrap_or(Number(0));
                Ok(json!(n * 2))
            });
        });
    });
}

fn module_clasic(c: &mut ClassBuilder<'_>) {
    c.collection(|c| {
        c.def("module_clasic", |_| Ok(json!("is_module")));
    });
}

fn generic_api(b: &mut RegistryBuilder) {
    b.class("GenericApi", Some("ApplicationApi"), |c| {
        c.include(module_clasic);
        c.plugin("test_1");
        c.desc("Simple generic api");
        c.detail("<p>Nothing <b>specific</b>.</p>");

        c.collection(|c| {
            c.def("about", |_| Err(anyhow::anyhow!("undefined local variable `xxx`").into()));

            c.def("get_money", |call| Err(call.error_code(405)));

            c.desc("This will just return ok");
            c.detail("No need for big details");
            c.def("all_ok", |_| Ok(json!("ok")));

            c.def("param_test_1", |call| Ok(Value::Object(call.params().clone())));

            c.desc("Passing params");
            c.params(|p| {
                p.optional("abc", "string").default_to("baz");
                p.field("foo", "string");
                p.optional("bar", "integer");
            });
            c.def("param_test_2", |call| Ok(Value::Object(call.params().clone())));

            c.annotate("anonymous", Vec::<Value>::new());
            c.def("anon_test", |call| {
                Ok(call.get::<AnonymousOk>().map_or(Value::Null, |a| json!(a.0)))
            });

            c.annotate("require_role", ["admin"]);
            c.def("admin_only", |_| Ok(json!("welcome")));

            c.params(|p| {
                p.field("labels_dup", "label").array();
                p.optional("labels_nodup", "label").no_duplicates();
            });
            c.def("list_labels", |call| Ok(Value::Object(call.params().clone())));

            c.def("named_error_test", |call| Err(call.error("named_error")));

            c.def("panic_test", |_| panic!("handler exploded"));

            c.def("falsy", |call| {
                call.data(false);
                Ok(json!("ignored"))
            });

            c.def("status_error", |call| {
                call.response()
                    .error_with("Teapot", ErrorOptions::default().code("teapot").status(418));
                Ok(Value::Null)
            });
        });
    });
}

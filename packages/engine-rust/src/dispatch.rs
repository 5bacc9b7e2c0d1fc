//! Call execution: admission, validation, annotations, lifecycle hooks,
//! handler and error routing.
//!
//! Every stage runs behind a panic boundary. Whatever user code does, the
//! caller gets a complete envelope.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use http::Method;
use joshua_core::{CallRequest, Envelope, ErrorOptions, HostAdapter, Params, Value};

use crate::call::Call;
use crate::descriptor::HookKey;
use crate::error::{ControlledError, DispatchError, PanicError};
use crate::registry::{NamedError, Registry, ResolvedClass};

/// Message of unhandled errors nobody rescued.
pub const INTERNAL_ERROR: &str = "Internal server error";

const STATUS_INTERNAL: u16 = 500;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Runs one call against a resolved class.
pub(crate) fn execute<'r>(
    registry: &'r Registry,
    class: &'r ResolvedClass,
    mut request: CallRequest,
    host: Option<&'r dyn HostAdapter>,
) -> Envelope {
    let started = Instant::now();
    let action = request.action.clone();

    let span = tracing::info_span!(
        "api_call",
        class = %class.name,
        action = %action,
        scope = %request.scope(),
        call_id = %request.uid,
        duration_ms = tracing::field::Empty,
        outcome = tracing::field::Empty,
    );
    let _entered = span.enter();

    if registry.config.html_safe_params {
        make_html_safe(&mut request.params);
    }

    let mut call = Call::new(registry, class, request, host);
    let admitted = is_admitted(&call);

    if admitted {
        guarded(&mut call, run_pipeline);
        guarded(&mut call, |call| run_hooks(call, HookKey::AfterAll));
    } else {
        let text = format!("{} request is not allowed", call.method());
        call.response().error(text);
    }

    let envelope = call.into_response().render();

    let outcome = match (admitted, envelope.success) {
        (false, _) => "rejected",
        (true, true) => "ok",
        (true, false) => "error",
    };

    #[allow(clippy::cast_possible_truncation)]
    let duration_u64 = started.elapsed().as_millis() as u64;
    span.record("duration_ms", duration_u64);
    span.record("outcome", outcome);

    metrics::counter!("joshua_calls_total", "class" => class.name.clone(), "outcome" => outcome).increment(1);
    metrics::histogram!("joshua_call_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);

    tracing::info!(
        class = %class.name,
        action = %action,
        status = envelope.status,
        duration_ms = duration_u64,
        outcome = outcome,
        "call complete"
    );

    envelope
}

/// POST always passes; other methods need the descriptor allow set, or
/// development mode. Unknown actions only admit POST.
fn is_admitted(call: &Call<'_>) -> bool {
    let method = call.method();
    call.development()
        || *method == Method::POST
        || call.descriptor().is_some_and(|d| d.admits(method))
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Validation, annotations, then the hook-wrapped handler. Stops at the
/// first stage that records errors.
fn run_pipeline(call: &mut Call<'_>) -> Result<(), DispatchError> {
    validate_params(call)?;
    if call.response_ref().has_error() {
        return Ok(());
    }

    run_annotations(call)?;
    if call.response_ref().has_error() {
        return Ok(());
    }

    let Some(descriptor) = call.descriptor() else {
        let text = format!("API method {}:{} not found", call.scope(), call.action());
        return Err(ControlledError::new(text).into());
    };

    run_hooks(call, HookKey::BeforeAll)?;
    run_hooks(call, HookKey::before(Some(call.scope())))?;

    let data = (descriptor.handler())(call)?;
    call.data(data);

    run_hooks(call, HookKey::after(Some(call.scope())))
}

fn validate_params(call: &mut Call<'_>) -> Result<(), DispatchError> {
    let Some(descriptor) = call.descriptor() else {
        return Ok(());
    };
    if descriptor.params.is_empty() {
        return Ok(());
    }

    let validated = call
        .registry()
        .validator()
        .validate(&descriptor.params, call.params())
        .map_err(DispatchError::unhandled)?;

    *call.params_mut() = validated.params;
    for (field, text) in validated.errors {
        call.response().error_detail(field, text);
    }
    Ok(())
}

fn run_annotations(call: &mut Call<'_>) -> Result<(), DispatchError> {
    let Some(descriptor) = call.descriptor() else {
        return Ok(());
    };
    let registry = call.registry();
    for annotation in &descriptor.annotations {
        if let Some(body) = registry.annotations.get(&annotation.name) {
            body(call, &annotation.args)?;
        }
    }
    Ok(())
}

/// Runs one hook list, root class first.
fn run_hooks(call: &mut Call<'_>, key: HookKey) -> Result<(), DispatchError> {
    let class = call.class();
    for hook in class.hooks(key) {
        hook(call)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Error routing
// ---------------------------------------------------------------------------

/// Runs a stage, converting panics to unhandled errors and routing any
/// error into the response. A panic while routing leaves a generic 500.
fn guarded<'r>(call: &mut Call<'r>, stage: impl FnOnce(&mut Call<'r>) -> Result<(), DispatchError>) {
    let result = catch_unwind(AssertUnwindSafe(|| stage(call))).unwrap_or_else(|payload| {
        Err(DispatchError::Unhandled(anyhow::Error::new(PanicError::from_payload(&*payload))))
    });

    let Err(err) = result else {
        return;
    };

    if catch_unwind(AssertUnwindSafe(|| route(call, err))).is_err() {
        call.response().error_with(
            INTERNAL_ERROR,
            ErrorOptions::default().code("Panic").status(STATUS_INTERNAL),
        );
    }
}

fn route(call: &mut Call<'_>, err: DispatchError) {
    match err {
        DispatchError::Controlled(err) => route_controlled(call, err),
        DispatchError::Unhandled(err) => route_unhandled(call, &err),
    }
}

/// Named text replaces the raw text. A named handler owns the response and
/// may recover the call. Anything else is reported with its own text.
fn route_controlled(call: &mut Call<'_>, err: ControlledError) {
    let opts = ErrorOptions {
        code: err.code.clone(),
        status: err.status,
    };

    match call.registry().named.get(&err.lookup_key()) {
        Some(NamedError::Text(text)) => {
            call.response().error_with(text.clone(), opts);
        }
        Some(NamedError::Handler(handler)) => {
            handler(call);
        }
        None => {
            call.response().error_with(err.text, opts);
        }
    }
}

fn route_unhandled(call: &mut Call<'_>, err: &anyhow::Error) {
    let registry = call.registry();
    if !registry.config.suppress_diagnostics {
        registry.sink.report(call.class_name(), call.action(), err);
    }

    let tag = if err.is::<PanicError>() { "Panic" } else { "InternalError" };

    let handler = registry
        .rescue_kinds
        .iter()
        .find(|(matches, _)| matches(err))
        .map(|(_, handler)| handler)
        .or(registry.rescue_all.as_ref());

    match handler {
        Some(handler) => {
            handler(call, err);
            call.response().status(STATUS_INTERNAL);
            if !call.response_ref().has_error() {
                call.response()
                    .error_with(INTERNAL_ERROR, ErrorOptions::default().code(tag));
            }
        }
        None => {
            call.response().error_with(
                INTERNAL_ERROR,
                ErrorOptions::default().code(tag).status(STATUS_INTERNAL),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// Replaces `<` with `#LT;` in every string, nested maps and lists included.
pub(crate) fn make_html_safe(params: &mut Params) {
    params.values_mut().for_each(html_safe);
}

fn html_safe(value: &mut Value) {
    match value {
        Value::String(text) if text.contains('<') => *text = text.replace('<', "#LT;"),
        Value::Array(items) => items.iter_mut().for_each(html_safe),
        Value::Object(map) => map.values_mut().for_each(html_safe),
        _ => {}
    }
}

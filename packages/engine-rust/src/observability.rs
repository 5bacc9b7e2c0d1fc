//! Diagnostics boundary and subscriber setup.
//!
//! Unhandled errors leave the engine only through [`DiagnosticSink`]. The
//! default sink logs them; tests install [`CollectingSink`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

/// Receiver of unhandled errors, one report per error.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, class: &str, action: &str, err: &anyhow::Error);
}

/// Logs every report at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, class: &str, action: &str, err: &anyhow::Error) {
        tracing::error!(class, action, error = ?err, "unhandled error in api call");
    }
}

/// Keeps reports in memory as `"Class#action: error"` lines.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    reports: Arc<Mutex<Vec<String>>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().clone()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, class: &str, action: &str, err: &anyhow::Error) {
        self.reports.lock().push(format!("{class}#{action}: {err}"));
    }
}

/// Installs a global `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`). Returns `false` if one was already installed.
pub fn init_tracing(json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_formats_reports() {
        let sink = CollectingSink::new();
        let handle: Arc<dyn DiagnosticSink> = Arc::new(sink.clone());
        handle.report("GenericApi", "about", &anyhow::anyhow!("boom"));
        assert_eq!(sink.reports(), vec!["GenericApi#about: boom".to_string()]);
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing(false);
        assert!(!init_tracing(true));
    }
}

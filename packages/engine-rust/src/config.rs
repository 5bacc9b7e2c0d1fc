use joshua_core::Locale;

/// Engine-level configuration, fixed when the registry is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Development mode: every HTTP method is admitted and unhandled errors
    /// are reported with full detail.
    pub development: bool,
    /// Suppresses the diagnostic sink, as under test execution.
    pub suppress_diagnostics: bool,
    /// Replaces `<` with `#LT;` in every string param before validation.
    pub html_safe_params: bool,
    /// Locale of validation messages.
    pub locale: Locale,
    /// Path prefix the auto-mount helper serves below.
    pub mount_on: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            development: false,
            suppress_diagnostics: false,
            html_safe_params: true,
            locale: Locale::En,
            mount_on: "/".to_string(),
        }
    }
}

impl EngineConfig {
    /// Reads `JOSHUA_ENV` (`development` or `test`), `JOSHUA_MOUNT_ON` and
    /// `JOSHUA_LOCALE` over the defaults. Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        match lookup("JOSHUA_ENV").as_deref() {
            Some("development") => config.development = true,
            Some("test") => config.suppress_diagnostics = true,
            _ => {}
        }
        if let Some(mount_on) = lookup("JOSHUA_MOUNT_ON").filter(|m| !m.is_empty()) {
            config.mount_on = mount_on;
        }
        if let Some(raw) = lookup("JOSHUA_LOCALE") {
            match raw.parse() {
                Ok(locale) => config.locale = locale,
                Err(err) => tracing::warn!(%err, "ignoring JOSHUA_LOCALE"),
            }
        }

        config
    }
}

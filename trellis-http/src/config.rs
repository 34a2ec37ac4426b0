use serde::Deserialize;

/// Environment variable read by [`DispatcherConfig::from_env`].
pub const DEBUG_ENV_VAR: &str = "TRELLIS_DEBUG";

/// Configuration of a [`Dispatcher`].
///
/// [`Dispatcher`]: crate::Dispatcher
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Render failure details into error pages.
    ///
    /// Never enable this in production, details can leak internals to clients.
    pub debug: bool,
}

impl DispatcherConfig {
    /// Create a new [`DispatcherConfig`] with everything disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a [`DispatcherConfig`] from the process environment.
    ///
    /// Debug mode is enabled when `TRELLIS_DEBUG` is one of
    /// `1`, `true`, `yes` or `on` (case-insensitive).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            debug: std::env::var(DEBUG_ENV_VAR)
                .ok()
                .as_deref()
                .is_some_and(parse_flag),
        }
    }

    /// Enable or disable debug error pages.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable or disable debug error pages.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    ["1", "true", "yes", "on"]
        .iter()
        .any(|flag| value.eq_ignore_ascii_case(flag))
}

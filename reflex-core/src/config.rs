//! Engine Configuration
//!
//! Per-component options and the manager-wide defaults they fall back to.
//! Both derive serde so hosts can ship them as JSON next to the rest of
//! their settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default debounce window for coalescing change notifications.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

/// Attribute written on a component's DOM node so debugging tools can map
/// elements back to live instances.
pub const DEFAULT_DOM_ATTRIBUTE: &str = "data-reactive";

/// Reruns one instance may chain synchronously before further reruns are
/// dropped. Only immediate-mode components that write what they read get
/// anywhere near this.
pub const MAX_SYNCHRONOUS_RERUNS: u32 = 100;

/// Options for one component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentOptions {
    /// Coalesce bursts of changes into one trailing re-render.
    ///
    /// When off, every change re-renders synchronously.
    pub debounce: bool,

    /// Debounce window in milliseconds.
    pub debounce_window_ms: u64,

    /// Treat a panicking render like a failed one instead of unwinding
    /// into the host.
    pub catch_panics: bool,
}

impl ComponentOptions {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    /// Disable debouncing.
    pub fn immediate(mut self) -> Self {
        self.debounce = false;
        self
    }

    /// Set the debounce window.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    /// Check that the options describe a usable scheduler.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce && self.debounce_window_ms == 0 {
            return Err(ConfigError::ZeroDebounceWindow);
        }
        Ok(())
    }
}

impl Default for ComponentOptions {
    fn default() -> Self {
        Self {
            debounce: true,
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW.as_millis() as u64,
            catch_panics: true,
        }
    }
}

/// Settings shared by every instance a manager mounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Options for components that do not provide their own.
    pub defaults: ComponentOptions,

    /// Name of the debug attribute written on DOM handles.
    pub dom_attribute: String,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.defaults.validate()?;
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defaults: ComponentOptions::default(),
            dom_attribute: DEFAULT_DOM_ATTRIBUTE.to_string(),
        }
    }
}

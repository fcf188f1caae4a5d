//! Error types.
//!
//! Render failures are recoverable by design: the engine turns them into
//! placeholder output and never propagates them to the host. The other
//! error types cover the observable accessors and configuration loading.

use std::fmt;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Signal that data a render needs is not available yet.
///
/// Data-fetching code returns this (usually via `?`) to ask the engine for
/// a loading placeholder instead of a view. It is not logged as an error.
/// The render is retried on the next trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotReady {
    payload: Option<String>,
}

impl NotReady {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a diagnostic payload, e.g. the key being fetched.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

impl fmt::Display for NotReady {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Some(payload) => write!(f, "still loading: {payload}"),
            None => f.write_str("still loading"),
        }
    }
}

impl std::error::Error for NotReady {}

/// Outcome of a render callback that did not produce a view.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Required data is unavailable; render a loading placeholder.
    #[error(transparent)]
    NotReady(#[from] NotReady),

    /// The render failed with a plain diagnostic message.
    #[error("render failed: {0}")]
    Failed(String),

    /// The render failed with an underlying error.
    #[error("render failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RenderError {
    /// Wrap any error as an unexpected render failure.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Source(Box::new(error))
    }

    /// Check whether this is the not-ready signal.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }
}

impl From<ObservableError> for RenderError {
    fn from(error: ObservableError) -> Self {
        Self::other(error)
    }
}

/// Errors raised by the typed observable accessors.
#[derive(Debug, Error)]
pub enum ObservableError {
    #[error("failed to encode property `{property}`: {source}")]
    Serialize {
        property: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("property `{property}` does not hold the requested type: {source}")]
    Deserialize {
        property: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while arming a debounce timer.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("no Tokio runtime available to arm the debounce timer")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Errors raised while loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("debounce window must be greater than zero")]
    ZeroDebounceWindow,
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Observable(#[from] ObservableError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

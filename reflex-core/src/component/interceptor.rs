//! Render Interceptor
//!
//! Wraps the user render callback so that a render always produces some
//! output. The not-ready signal becomes a loading placeholder, any other
//! failure becomes an error placeholder plus a diagnostic log entry, and
//! the instance stays mounted either way.
//!
//! Both placeholders are represented by [`Rendered`] variants.
//! [`Rendered::placeholder_text`] gives hosts a fixed textual rendering of
//! them.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::definition::RenderContext;
use crate::error::RenderError;

/// Text hosts show for [`Rendered::Loading`].
pub const LOADING_TEXT: &str = "Loading...";

/// Text hosts show for [`Rendered::Errored`].
pub const ERROR_TEXT: &str = "error";

/// Outcome of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<V> {
    /// The callback produced no view.
    Empty,
    /// The callback produced a view.
    View(V),
    /// Data was not ready; carries the signal's payload, if any.
    Loading(Option<String>),
    /// The callback failed; carries the diagnostic.
    Errored(String),
}

impl<V> Rendered<V> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, Self::Errored(_))
    }

    pub fn view(&self) -> Option<&V> {
        match self {
            Self::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_view(self) -> Option<V> {
        match self {
            Self::View(view) => Some(view),
            _ => None,
        }
    }

    /// Fixed text for the placeholder variants.
    pub fn placeholder_text(&self) -> Option<&'static str> {
        match self {
            Self::Loading(_) => Some(LOADING_TEXT),
            Self::Errored(_) => Some(ERROR_TEXT),
            Self::Empty | Self::View(_) => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> Rendered<U>
    where
        F: FnOnce(V) -> U,
    {
        match self {
            Self::Empty => Rendered::Empty,
            Self::View(view) => Rendered::View(f(view)),
            Self::Loading(payload) => Rendered::Loading(payload),
            Self::Errored(diagnostic) => Rendered::Errored(diagnostic),
        }
    }
}

/// Maps a render attempt to a [`Rendered`] value.
#[derive(Debug, Clone, Copy)]
pub struct RenderInterceptor {
    catch_panics: bool,
}

impl RenderInterceptor {
    pub fn new(catch_panics: bool) -> Self {
        Self { catch_panics }
    }

    /// Run `render` with `cx` as its receiver and intercept its outcome.
    ///
    /// Never returns an error. Panics are caught as well unless the
    /// interceptor was built with `catch_panics` off.
    pub fn intercept<V, F>(&self, cx: &RenderContext, render: F) -> Rendered<V>
    where
        F: FnOnce(&RenderContext) -> Result<Option<V>, RenderError>,
    {
        let result = if self.catch_panics {
            match panic::catch_unwind(AssertUnwindSafe(|| render(cx))) {
                Ok(result) => result,
                Err(payload) => Err(RenderError::Failed(panic_message(payload.as_ref()))),
            }
        } else {
            render(cx)
        };

        match result {
            Ok(Some(view)) => Rendered::View(view),
            Ok(None) => Rendered::Empty,
            Err(RenderError::NotReady(signal)) => {
                tracing::trace!(
                    instance = %cx.id(),
                    component = cx.name(),
                    %signal,
                    "render not ready"
                );
                Rendered::Loading(signal.payload().map(str::to_owned))
            }
            Err(error) => {
                let diagnostic = error.to_string();
                tracing::error!(
                    instance = %cx.id(),
                    component = cx.name(),
                    error = %diagnostic,
                    "render failed"
                );
                Rendered::Errored(diagnostic)
            }
        }
    }
}

impl Default for RenderInterceptor {
    fn default() -> Self {
        Self::new(true)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("render panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("render panicked: {message}")
    } else {
        "render panicked".to_string()
    }
}

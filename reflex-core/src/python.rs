//! Python Bindings
//!
//! Exposes the pieces Python data-fetching code needs: the `NotReady`
//! exception to signal missing data, and an `Observable` property bag.
//!
//! Components are mounted and rendered from Rust only, so no engine path
//! receives a Python exception. `NotReady` is a marker type: fetchers raise
//! it in their own code, and whatever calls them turns it into the Rust
//! [`NotReady`](crate::NotReady) signal.
//!
//! Values cross the boundary as JSON text.

use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyValueError};
use pyo3::prelude::*;

use crate::observable::Observable;

create_exception!(
    _core,
    NotReady,
    PyException,
    "Raised when data a render needs is not available yet."
);

/// Python-exposed Observable.
///
/// Reads and writes go through the same code as the Rust handle, so reads
/// made inside a capture pass are tracked and every write notifies.
#[pyclass(name = "Observable")]
pub struct PyObservable {
    inner: Observable,
}

#[pymethods]
impl PyObservable {
    #[new]
    fn new() -> Self {
        Self {
            inner: Observable::new(),
        }
    }

    /// Stable identity of the object.
    #[getter]
    fn id(&self) -> u64 {
        self.inner.id().raw()
    }

    /// Read a property as JSON text. Tracked like any other read.
    fn get_json(&self, property: &str) -> Option<String> {
        self.inner.get_value(property).map(|value| value.to_string())
    }

    /// Write a property from JSON text and notify observers.
    fn set_json(&self, property: &str, value: &str) -> PyResult<()> {
        let value: serde_json::Value =
            serde_json::from_str(value).map_err(|e| PyValueError::new_err(e.to_string()))?;
        self.inner.set_value(property, value);
        Ok(())
    }

    /// Remove a property. Returns whether it was present.
    fn remove(&self, property: &str) -> bool {
        self.inner.remove(property).is_some()
    }

    fn version(&self, property: &str) -> u64 {
        self.inner.version(property)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys().iter().map(|key| key.to_string()).collect()
    }

    fn __repr__(&self) -> String {
        format!("Observable(id={}, values={})", self.inner.id(), self.inner.to_json())
    }
}

/// Register the bindings on the extension module.
pub(crate) fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyObservable>()?;
    m.add("NotReady", m.py().get_type_bound::<NotReady>())?;
    Ok(())
}

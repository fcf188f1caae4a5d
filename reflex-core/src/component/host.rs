//! Host framework boundary.
//!
//! The engine does not render anything itself. It asks the host to re-run
//! the render hook through [`RenderHost`], and optionally tags the host's
//! element through [`DomHandle`] so debugging tools can find the instance.

use std::sync::Arc;

use super::definition::Component;
use super::instance::Instance;

/// Host operations the engine calls into.
pub trait RenderHost<C: Component>: Send + Sync {
    /// Re-run `instance`'s render hook outside the data-driven path.
    ///
    /// Typically calls [`Instance::render`] and commits the result.
    fn force_rerender(&self, instance: &Arc<Instance<C>>);
}

impl<C, F> RenderHost<C> for F
where
    C: Component,
    F: Fn(&Arc<Instance<C>>) + Send + Sync,
{
    fn force_rerender(&self, instance: &Arc<Instance<C>>) {
        self(instance)
    }
}

/// Element-like handle used only for debug tagging.
///
/// Absence of a handle, or a handle that ignores writes, never affects
/// rendering.
pub trait DomHandle: Send + Sync {
    fn get_attribute(&self, name: &str) -> Option<String>;

    fn set_attribute(&self, name: &str, value: &str);
}

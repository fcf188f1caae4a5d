//! Capture Passes
//!
//! A capture pass runs a function while reporting every property read
//! against an [`Observable`] to a listener. This is how a render discovers
//! which (object, property) pairs it depends on.
//!
//! # Implementation
//!
//! We use a thread-local stack of active passes. Entering a pass pushes a
//! frame holding the listener; reads report to the innermost frame only.
//! The frame is popped by a guard, so the stack stays balanced even if the
//! captured function panics.
//!
//! Nested passes are isolated: reads made inside an inner pass are never
//! attributed to the outer one.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::object::Observable;
use super::observer::PropertyKey;

type AccessListener = Rc<dyn Fn(&Observable, &PropertyKey)>;

thread_local! {
    static CAPTURE_STACK: RefCell<Vec<CaptureFrame>> = const { RefCell::new(Vec::new()) };
    static NEXT_PASS: Cell<u64> = const { Cell::new(0) };
}

/// An entry in the capture stack.
struct CaptureFrame {
    pass: u64,
    /// `None` for untracked sections.
    listener: Option<AccessListener>,
}

/// Guard for an active capture pass. Pops the frame when dropped.
pub struct CaptureContext {
    pass: u64,
}

impl CaptureContext {
    /// Run `f` inside a new capture pass and return its result.
    ///
    /// `on_access` is invoked synchronously for every property read made
    /// by `f` (and anything it calls) on this thread, in read order.
    /// Repeated reads are reported every time; deduplication is the
    /// listener's job.
    pub fn capture<R, F, A>(f: F, on_access: A) -> R
    where
        F: FnOnce() -> R,
        A: Fn(&Observable, &PropertyKey) + 'static,
    {
        let _ctx = Self::enter(Some(Rc::new(on_access)));
        f()
    }

    /// Run `f` with access reporting suspended.
    pub fn untracked<R, F>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _ctx = Self::enter(None);
        f()
    }

    fn enter(listener: Option<AccessListener>) -> Self {
        let pass = NEXT_PASS.with(|next| {
            let pass = next.get();
            next.set(pass.wrapping_add(1));
            pass
        });
        CAPTURE_STACK.with(|stack| stack.borrow_mut().push(CaptureFrame { pass, listener }));
        Self { pass }
    }

    /// Check if reads on this thread are currently being reported.
    pub fn is_active() -> bool {
        CAPTURE_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|frame| frame.listener.is_some())
        })
    }

    /// Number of nested passes on this thread.
    pub fn depth() -> usize {
        CAPTURE_STACK.with(|stack| stack.borrow().len())
    }

    /// Report a read to the innermost pass, if any.
    ///
    /// The listener is cloned out first so it may itself read observables
    /// or install observers without re-borrowing the stack.
    pub(crate) fn report(object: &Observable, property: &PropertyKey) {
        let listener = CAPTURE_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|frame| frame.listener.clone())
        });
        if let Some(listener) = listener {
            listener(object, property);
        }
    }
}

impl Drop for CaptureContext {
    fn drop(&mut self) {
        CAPTURE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame.pass, self.pass,
                    "CaptureContext mismatch: expected pass {}, got {}",
                    self.pass, frame.pass
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&Observable, &PropertyKey)) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |_: &Observable, prop: &PropertyKey| {
            sink.borrow_mut().push(prop.to_string())
        })
    }

    #[test]
    fn capture_reports_reads_in_order() {
        let obj = Observable::new();
        obj.set_value("a", 1.into());
        obj.set_value("b", 2.into());

        let (seen, listener) = recorder();
        let sum = CaptureContext::capture(
            || {
                let a = obj.get_value("a").and_then(|v| v.as_i64()).unwrap_or(0);
                let b = obj.get_value("b").and_then(|v| v.as_i64()).unwrap_or(0);
                let a2 = obj.get_value("a").and_then(|v| v.as_i64()).unwrap_or(0);
                a + b + a2
            },
            listener,
        );

        assert_eq!(sum, 4);
        assert_eq!(*seen.borrow(), vec!["a", "b", "a"]);
    }

    #[test]
    fn context_is_cleaned_up_after_pass() {
        assert!(!CaptureContext::is_active());
        assert_eq!(CaptureContext::depth(), 0);

        CaptureContext::capture(
            || {
                assert!(CaptureContext::is_active());
                assert_eq!(CaptureContext::depth(), 1);
            },
            |_, _| {},
        );

        assert!(!CaptureContext::is_active());
        assert_eq!(CaptureContext::depth(), 0);
    }

    #[test]
    fn nested_passes_are_isolated() {
        let obj = Observable::new();
        let (outer, outer_listener) = recorder();
        let (inner, inner_listener) = recorder();

        CaptureContext::capture(
            || {
                obj.get_value("outer");
                CaptureContext::capture(
                    || {
                        obj.get_value("inner");
                    },
                    inner_listener,
                );
                obj.get_value("outer-again");
            },
            outer_listener,
        );

        assert_eq!(*outer.borrow(), vec!["outer", "outer-again"]);
        assert_eq!(*inner.borrow(), vec!["inner"]);
    }

    #[test]
    fn untracked_reads_are_not_reported() {
        let obj = Observable::new();
        let (seen, listener) = recorder();

        CaptureContext::capture(
            || {
                CaptureContext::untracked(|| {
                    assert!(!CaptureContext::is_active());
                    obj.get_value("hidden");
                });
                obj.get_value("shown");
            },
            listener,
        );

        assert_eq!(*seen.borrow(), vec!["shown"]);
    }

    #[test]
    fn stack_survives_panicking_pass() {
        let result = std::panic::catch_unwind(|| {
            CaptureContext::capture(|| panic!("boom"), |_, _| {});
        });
        assert!(result.is_err());
        assert_eq!(CaptureContext::depth(), 0);
    }
}

//! Scoped deferred execution.
//!
//! A [`Defer`] guard runs its closure exactly once when it goes out of
//! scope, on normal exit and on unwind alike. Several guards in one scope
//! run in reverse order of creation, following Rust's drop order.
//!
//! ```
//! use std::cell::RefCell;
//! use burrow::defer;
//!
//! let log = RefCell::new(Vec::new());
//! {
//!     defer! { log.borrow_mut().push("first registered"); }
//!     defer! { log.borrow_mut().push("second registered"); }
//! }
//! assert_eq!(*log.borrow(), ["second registered", "first registered"]);
//! ```
//!
//! When the deferred code needs to mutate state that the scope also uses,
//! hand the state to [`defer_with`]: the guard owns it, dereferences to it
//! for the rest of the scope, and passes it to the closure at the end.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Runs a closure when dropped.
#[must_use = "the closure runs immediately if the guard is not bound to a name"]
pub struct Defer<F: FnOnce()> {
    /// `None` once disarmed.
    action: Option<F>,
}

/// Register `action` to run when the returned guard is dropped.
pub fn defer<F: FnOnce()>(action: F) -> Defer<F> {
    Defer {
        action: Some(action),
    }
}

impl<F: FnOnce()> Defer<F> {
    /// Disarm the guard; the closure is dropped without running.
    pub fn cancel(mut self) {
        self.action = None;
    }
}

impl<F: FnOnce()> Drop for Defer<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

impl<F: FnOnce()> fmt::Debug for Defer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defer")
            .field("armed", &self.action.is_some())
            .finish()
    }
}

/// Owns a value for the rest of a scope and hands it to a closure on drop.
#[must_use = "the closure runs immediately if the guard is not bound to a name"]
pub struct DeferWith<T, F: FnOnce(&mut T)> {
    value: T,
    action: Option<F>,
}

/// Wrap `value` so that `action(&mut value)` runs when the guard is dropped.
///
/// ```
/// use burrow::{defer_with, Arena};
///
/// let mut arena = Arena::with_capacity(4096).unwrap();
/// {
///     let start = arena.checkpoint();
///     let mut arena = defer_with(&mut arena, move |arena| {
///         arena.restore(start).expect("checkpoint is from this generation");
///     });
///     arena.alloc(128).unwrap();
/// }
/// assert_eq!(arena.used(), 0);
/// ```
pub fn defer_with<T, F: FnOnce(&mut T)>(value: T, action: F) -> DeferWith<T, F> {
    DeferWith {
        value,
        action: Some(action),
    }
}

impl<T, F: FnOnce(&mut T)> DeferWith<T, F> {
    /// Disarm the guard; the value is dropped normally, the closure never runs.
    pub fn cancel(mut self) {
        self.action = None;
    }
}

impl<T, F: FnOnce(&mut T)> Deref for DeferWith<T, F> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T, F: FnOnce(&mut T)> DerefMut for DeferWith<T, F> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T, F: FnOnce(&mut T)> Drop for DeferWith<T, F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action(&mut self.value);
        }
    }
}

impl<T: fmt::Debug, F: FnOnce(&mut T)> fmt::Debug for DeferWith<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferWith")
            .field("value", &self.value)
            .field("armed", &self.action.is_some())
            .finish()
    }
}

/// Register a block to run at the end of the enclosing scope.
///
/// Expands to a [`Defer`] guard bound to a hidden local, so the block runs
/// when that local is dropped.
#[macro_export]
macro_rules! defer {
    ($($body:tt)*) => {
        let _deferred = $crate::defer::defer(|| { $($body)* });
    };
}

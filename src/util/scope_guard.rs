/// A guard that executes a closure when it goes out of scope.
///
/// The closure runs on normal return, early return or unwinding, which is
/// how a task thread guarantees its final `finish` and `exited` signals even when
/// the body panics.
pub(crate) struct ScopeGuard<F: FnOnce()> {
    // Option so the closure is taken exactly once
    closure: Option<F>,
}

impl<F: FnOnce()> ScopeGuard<F> {
    /// Creates a new, armed `ScopeGuard` with the given closure.
    pub(crate) const fn new(closure: F) -> Self {
        Self {
            closure: Some(closure),
        }
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        if let Some(closure) = self.closure.take() {
            closure();
        }
    }
}

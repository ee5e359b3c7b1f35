//! Job descriptors queued on a [`TaskPool`](super::TaskPool).

use std::fmt;
use std::sync::Arc;

/// Function run by a worker for a [`WorkItem`].
pub type WorkFn<P> = Arc<dyn Fn(&P) + Send + Sync + 'static>;

/// A queued job: a function, its parameters, and an optional callback that
/// runs with the same parameters after the function returns.
///
/// Cloning is cheap; clones share the function objects and parameters, which
/// is how cycling pools re-deliver one resident item many times.
pub struct WorkItem<P> {
    proc: WorkFn<P>,
    params: Arc<P>,
    callback: Option<WorkFn<P>>,
}

impl<P> WorkItem<P> {
    /// Item running `proc(&params)`.
    pub fn new<F>(proc: F, params: P) -> Self
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        Self {
            proc: Arc::new(proc),
            params: Arc::new(params),
            callback: None,
        }
    }

    /// Run `callback(&params)` after the function.
    #[must_use]
    pub fn with_callback<C>(mut self, callback: C) -> Self
    where
        C: Fn(&P) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Parameters passed to the function and callback.
    #[must_use]
    pub fn params(&self) -> &P {
        &self.params
    }

    /// Whether a callback is attached.
    #[must_use]
    pub const fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn run(&self) {
        (self.proc)(&self.params);
        if let Some(callback) = &self.callback {
            callback(&self.params);
        }
    }
}

impl<P> Clone for WorkItem<P> {
    fn clone(&self) -> Self {
        Self {
            proc: Arc::clone(&self.proc),
            params: Arc::clone(&self.params),
            callback: self.callback.clone(),
        }
    }
}

impl<P: fmt::Debug> fmt::Debug for WorkItem<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("params", &self.params)
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

//! # Cleanup registry
//!
//! Ordered, identity-keyed collection of zero-argument cleanup actions.
//! Actions run exactly once each, most recently registered first, on the
//! fatal path only. The registry never invokes an action it has not
//! already removed, which is what makes re-entrant use from inside a
//! running action safe.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{RegistryError, Result};

/// A registrable cleanup callback.
///
/// Identity is the `Arc` allocation: two handles match only if one was
/// cloned from the other. Two closures with identical behavior stay
/// distinguishable. Keep the handle around if the action must be
/// deregistered later.
pub type CleanupFn = Arc<dyn Fn() + Send + Sync>;

/// Wrap a closure or function as a cleanup handle.
pub fn cleanup_fn<F>(f: F) -> CleanupFn
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered set of pending cleanup actions.
///
/// The front of the queue is the most recently registered action and the
/// first one to run during a drain.
#[derive(Default)]
pub struct CleanupRegistry {
    actions: VecDeque<CleanupFn>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self {
            actions: VecDeque::new(),
        }
    }

    /// Register an action at the front of the run order.
    ///
    /// Returns [`RegistryError::Duplicate`] if the same handle is already
    /// registered and [`RegistryError::Alloc`] if storage for the entry
    /// cannot be reserved. The registry is unchanged on any error.
    pub fn register(&mut self, action: &CleanupFn) -> Result<()> {
        if self.actions.iter().any(|a| Arc::ptr_eq(a, action)) {
            return Err(RegistryError::Duplicate);
        }
        self.actions
            .try_reserve(1)
            .map_err(|_| RegistryError::Alloc)?;
        self.actions.push_front(Arc::clone(action));
        debug!(pending = self.actions.len(), "cleanup action registered");
        Ok(())
    }

    /// Remove an action without invoking it.
    ///
    /// Returns [`RegistryError::NotFound`] if no registered handle matches.
    pub fn deregister(&mut self, action: &CleanupFn) -> Result<()> {
        match self.actions.iter().position(|a| Arc::ptr_eq(a, action)) {
            Some(idx) => {
                self.actions.remove(idx);
                debug!(pending = self.actions.len(), "cleanup action deregistered");
                Ok(())
            }
            None => Err(RegistryError::NotFound),
        }
    }

    /// Remove and return the next action to run.
    ///
    /// Callers invoke the returned action only after this call, so the
    /// registry never contains an action that is currently running. A
    /// nested drain started from inside an action sees only the actions
    /// that have not run yet.
    pub fn take_next(&mut self) -> Option<CleanupFn> {
        self.actions.pop_front()
    }

    /// Remove and invoke every pending action, most recently registered
    /// first, until the registry is empty.
    pub fn drain_and_run(&mut self) {
        while let Some(action) = self.take_next() {
            trace!(remaining = self.actions.len(), "running cleanup action");
            action();
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

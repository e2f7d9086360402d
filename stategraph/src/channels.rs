//! State updaters: control how a node's returned state merges into the
//! current state.
//!
//! The default `ReplaceUpdater` replaces the whole state; workflows whose
//! state has merge rules (e.g. append-only message lists, permission flags
//! that must not regress) install a `FieldBasedUpdater` with a custom merge
//! function.

use std::sync::Arc;

/// Merges a node's output into the current state.
pub trait StateUpdater<S>: Send + Sync {
    fn apply_update(&self, current: &mut S, update: &S);
}

/// Shared trait object form used by graphs.
pub type BoxedStateUpdater<S> = Arc<dyn StateUpdater<S>>;

/// Full replacement: the node's output becomes the new state.
pub struct ReplaceUpdater;

impl<S: Clone> StateUpdater<S> for ReplaceUpdater {
    fn apply_update(&self, current: &mut S, update: &S) {
        *current = update.clone();
    }
}

/// Per-field merge driven by a caller-provided function.
pub struct FieldBasedUpdater<S> {
    merge: Arc<dyn Fn(&mut S, &S) + Send + Sync>,
}

impl<S> FieldBasedUpdater<S> {
    pub fn new(merge: impl Fn(&mut S, &S) + Send + Sync + 'static) -> Self {
        Self {
            merge: Arc::new(merge),
        }
    }
}

impl<S> StateUpdater<S> for FieldBasedUpdater<S> {
    fn apply_update(&self, current: &mut S, update: &S) {
        (self.merge)(current, update);
    }
}

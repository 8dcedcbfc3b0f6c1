//! Atomic snapshot publication.

use crate::events::{ErrorEvent, EventNotifier};
use crate::reducer::{self, Reduction};
use crate::snapshot::Snapshot;
use formsync_protocol::Action;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Holds the current snapshot and publishes reduced successors.
///
/// Every write goes through [`dispatch`](Self::dispatch): the batch is
/// reduced under the write lock and the result replaces the current
/// snapshot in one step, so readers only ever see pre- or post-batch
/// state. Listeners run after the lock is released.
pub struct StateStore {
    current: RwLock<Arc<Snapshot>>,
    events: Arc<EventNotifier>,
}

impl StateStore {
    /// Creates a store holding an empty snapshot.
    pub fn new(events: Arc<EventNotifier>) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::new())),
            events,
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Returns the current revision.
    pub fn rev(&self) -> u64 {
        self.current.read().rev()
    }

    /// Returns the notifier this store reports to.
    pub fn events(&self) -> &Arc<EventNotifier> {
        &self.events
    }

    /// Reduces `actions` onto the current snapshot and publishes the result.
    ///
    /// Rejected actions are reported to `error` listeners as client errors;
    /// `update` listeners are then notified exactly once. Returns the
    /// installed snapshot.
    pub fn dispatch(&self, actions: &[Action], new_rev: Option<u64>) -> Arc<Snapshot> {
        let (installed, rejected) = {
            let mut current = self.current.write();
            let Reduction { snapshot, rejected } = reducer::apply(&current, actions, new_rev);
            let installed = Arc::new(snapshot);
            *current = Arc::clone(&installed);
            (installed, rejected)
        };

        debug!(
            actions = actions.len(),
            rejected = rejected.len(),
            rev = installed.rev(),
            "snapshot installed"
        );

        for err in rejected {
            self.events.emit_error(&ErrorEvent::client(err));
        }
        self.events.emit_update();

        installed
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("rev", &self.rev())
            .finish_non_exhaustive()
    }
}

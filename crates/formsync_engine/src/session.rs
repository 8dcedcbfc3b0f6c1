//! The public session handle.

use crate::config::SessionConfig;
use crate::coordinator::{SyncCoordinator, SyncState, SyncStats};
use crate::error::SyncResult;
use crate::queue::{ActionQueue, Debouncer};
use crate::transport::SessionTransport;
use formsync_core::{
    ErrorEvent, EventClass, EventNotifier, ListenerId, Snapshot, StateStore, SyncStatus,
};
use formsync_protocol::{Action, ErrorRecord, Item, ValueSet};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// One remote session, seen from the client.
///
/// Local calls such as [`set_answer`](Self::set_answer) apply to the
/// snapshot immediately and are pushed to the authority once the session
/// has been quiet for [`SessionConfig::debounce`]. The authority's answer
/// then replaces the optimistic result.
///
/// `Session` is a cheap handle: clones share the same state.
///
/// # Example
///
/// ```no_run
/// use formsync_engine::{MockTransport, Session, SessionConfig};
/// use serde_json::json;
///
/// # async fn demo() -> formsync_engine::SyncResult<()> {
/// let session = Session::new(SessionConfig::new("s-1"), MockTransport::new());
/// session.on_update(|| println!("state changed"));
///
/// session.pull().await?;
/// session.set_answer("age", json!(42));
/// session.flush().await?;
/// # Ok(())
/// # }
/// ```
pub struct Session<T: SessionTransport + 'static> {
    inner: Arc<SessionInner<T>>,
}

struct SessionInner<T: SessionTransport + 'static> {
    config: SessionConfig,
    store: Arc<StateStore>,
    queue: ActionQueue,
    debouncer: Debouncer,
    coordinator: SyncCoordinator<T>,
}

impl<T: SessionTransport + 'static> SessionInner<T> {
    async fn push_pending(&self) -> SyncResult<Arc<Snapshot>> {
        let batch = self.queue.sweep();
        if batch.is_empty() {
            return Ok(self.store.snapshot());
        }
        self.coordinator.push(batch).await
    }
}

impl<T: SessionTransport + 'static> Session<T> {
    /// Creates a session talking to the authority through `transport`.
    pub fn new(config: SessionConfig, transport: T) -> Self {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    /// Creates a session over a transport shared with other owners.
    pub fn with_shared_transport(config: SessionConfig, transport: Arc<T>) -> Self {
        let store = Arc::new(StateStore::new(Arc::new(EventNotifier::new())));
        let coordinator =
            SyncCoordinator::new(config.session_id.clone(), transport, Arc::clone(&store));

        Self {
            inner: Arc::new(SessionInner {
                debouncer: Debouncer::new(config.debounce),
                queue: ActionQueue::new(),
                config,
                store,
                coordinator,
            }),
        }
    }

    /// Returns the session ID.
    pub fn session_id(&self) -> &str {
        &self.inner.config.session_id
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Gets an item by ID from the current snapshot.
    pub fn get_item(&self, id: &str) -> Option<Arc<Item>> {
        self.inner.store.snapshot().item_arc(id)
    }

    /// Gets a value set by ID from the current snapshot.
    pub fn get_value_set(&self, id: &str) -> Option<Arc<ValueSet>> {
        self.inner.store.snapshot().value_set_arc(id)
    }

    /// Returns true if the session has been marked complete.
    pub fn is_complete(&self) -> bool {
        self.inner.store.snapshot().is_complete()
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.store.snapshot()
    }

    /// Returns the last revision received from the authority.
    pub fn rev(&self) -> u64 {
        self.inner.store.rev()
    }

    /// Returns the active locale.
    pub fn locale(&self) -> Option<String> {
        self.inner.store.snapshot().locale().map(str::to_owned)
    }

    /// Returns the server-reported errors.
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.inner.store.snapshot().errors().to_vec()
    }

    /// Returns the number of local actions not yet pushed.
    pub fn pending_len(&self) -> usize {
        self.inner.queue.len()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Answers an item.
    pub fn set_answer(&self, id: impl Into<String>, value: Value) {
        self.enqueue(Action::answer(id, value));
    }

    /// Marks the session complete.
    pub fn complete(&self) {
        self.enqueue(Action::Complete);
    }

    /// Asks the authority for the next page.
    pub fn next(&self) {
        self.enqueue(Action::Next);
    }

    /// Asks the authority for the previous page.
    pub fn previous(&self) {
        self.enqueue(Action::Previous);
    }

    /// Applies `action` locally and queues it for the authority.
    ///
    /// The action is queued even if the local reducer rejects it; the
    /// authority decides what it means.
    pub fn enqueue(&self, action: Action) {
        self.inner.store.dispatch(std::slice::from_ref(&action), None);
        self.inner.queue.push(action);

        let weak: Weak<SessionInner<T>> = Arc::downgrade(&self.inner);
        let armed = self.inner.debouncer.arm(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(err) = inner.push_pending().await {
                warn!(session = %inner.config.session_id, error = %err, "debounced push failed");
            }
        });

        if !armed {
            debug!(
                session = %self.inner.config.session_id,
                pending = self.inner.queue.len(),
                "no runtime, actions wait for an explicit flush"
            );
        }
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// Replaces local state with the authority's full state.
    pub async fn pull(&self) -> SyncResult<Arc<Snapshot>> {
        self.inner.coordinator.pull().await
    }

    /// Pushes pending actions now instead of waiting for the timer.
    ///
    /// With nothing pending this returns the current snapshot without a
    /// round trip.
    pub async fn flush(&self) -> SyncResult<Arc<Snapshot>> {
        self.inner.debouncer.cancel();
        self.inner.push_pending().await
    }

    /// Gets the coordinator state.
    pub fn sync_state(&self) -> SyncState {
        self.inner.coordinator.state()
    }

    /// Gets the coordinator stats.
    pub fn sync_stats(&self) -> SyncStats {
        self.inner.coordinator.stats()
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Subscribes to snapshot updates.
    pub fn on_update<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.events().on_update(listener)
    }

    /// Subscribes to sync lifecycle events.
    pub fn on_sync<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(SyncStatus) + Send + Sync + 'static,
    {
        self.events().on_sync(listener)
    }

    /// Subscribes to client and sync errors.
    pub fn on_error<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        self.events().on_error(listener)
    }

    /// Unsubscribes a listener.
    pub fn remove_listener(&self, class: EventClass, id: ListenerId) -> bool {
        self.events().remove_listener(class, id)
    }

    /// Returns the session's event notifier.
    pub fn events(&self) -> &Arc<EventNotifier> {
        self.inner.store.events()
    }
}

impl<T: SessionTransport + 'static> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: SessionTransport + 'static> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.inner.config.session_id)
            .field("rev", &self.rev())
            .field("pending", &self.pending_len())
            .field("sync_state", &self.sync_state())
            .finish()
    }
}

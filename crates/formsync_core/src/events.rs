//! Event fan-out for session observers.
//!
//! Three independent listener lists:
//! - `update`: fired once per installed snapshot, no payload
//! - `sync`: fired with [`SyncStatus::InProgress`] before a round trip and
//!   [`SyncStatus::Done`] after a successful reconciliation
//! - `error`: fired with an [`ErrorEvent`] classified `CLIENT` or `SYNC`
//!
//! # Re-entrancy
//!
//! Emission works on a copy of the listener list taken when the emission
//! starts. Listeners may subscribe or unsubscribe (themselves or others)
//! from inside a callback: the current emission still reaches exactly the
//! listeners registered when it began, each once, and the change takes
//! effect from the next emission.

use crate::error::ClientError;
use parking_lot::RwLock;
use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The three event classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    /// Snapshot updated.
    Update,
    /// Sync lifecycle.
    Sync,
    /// Client or sync error.
    Error,
}

/// Sync lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// A round trip to the authority is about to start.
    InProgress,
    /// A round trip finished and its response was applied.
    Done,
}

impl SyncStatus {
    /// Returns the wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::InProgress => "INPROGRESS",
            SyncStatus::Done => "DONE",
        }
    }
}

/// Classification of a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Raised locally (invalid action, programmer error).
    Client,
    /// The authority rejected or failed a request.
    Sync,
}

impl ErrorClass {
    /// Returns the wire name of this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Client => "CLIENT",
            ErrorClass::Sync => "SYNC",
        }
    }
}

/// An error delivered to `error` listeners.
#[derive(Clone)]
pub struct ErrorEvent {
    class: ErrorClass,
    error: Arc<dyn StdError + Send + Sync>,
}

impl ErrorEvent {
    /// Creates a client error event.
    pub fn client(error: ClientError) -> Self {
        Self {
            class: ErrorClass::Client,
            error: Arc::new(error),
        }
    }

    /// Creates a sync error event.
    pub fn sync<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            class: ErrorClass::Sync,
            error: Arc::new(error),
        }
    }

    /// Returns the classification.
    pub fn class(&self) -> ErrorClass {
        self.class
    }

    /// Returns the error value.
    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Returns the error as a concrete type, if it is one.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }
}

impl fmt::Debug for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorEvent")
            .field("class", &self.class)
            .field("error", &self.error.to_string())
            .finish()
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class.as_str(), self.error)
    }
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct ListenerSet<T> {
    entries: RwLock<Vec<(ListenerId, Listener<T>)>>,
}

impl<T> ListenerSet<T> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    fn add(&self, id: ListenerId, listener: Listener<T>) {
        self.entries.write().push((id, listener));
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    fn emit(&self, payload: &T) {
        // Copy out so callbacks run without the lock held.
        let listeners: Vec<Listener<T>> = self
            .entries
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(payload);
        }
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// Multi-subscriber fan-out for update, sync and error events.
///
/// The notifier is thread-safe and is shared between the state store and
/// the sync coordinator.
pub struct EventNotifier {
    next_id: AtomicU64,
    update: ListenerSet<()>,
    sync: ListenerSet<SyncStatus>,
    error: ListenerSet<ErrorEvent>,
}

impl EventNotifier {
    /// Creates a notifier with no listeners.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            update: ListenerSet::new(),
            sync: ListenerSet::new(),
            error: ListenerSet::new(),
        }
    }

    fn allocate_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Subscribes to snapshot updates.
    pub fn on_update<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.update.add(id, Arc::new(move |_: &()| listener()));
        id
    }

    /// Subscribes to sync lifecycle events.
    pub fn on_sync<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(SyncStatus) + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.sync
            .add(id, Arc::new(move |status: &SyncStatus| listener(*status)));
        id
    }

    /// Subscribes to error events.
    pub fn on_error<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        let id = self.allocate_id();
        self.error.add(id, Arc::new(listener));
        id
    }

    /// Unsubscribes a listener.
    ///
    /// Returns false if `id` was not subscribed to `class`.
    pub fn remove_listener(&self, class: EventClass, id: ListenerId) -> bool {
        match class {
            EventClass::Update => self.update.remove(id),
            EventClass::Sync => self.sync.remove(id),
            EventClass::Error => self.error.remove(id),
        }
    }

    /// Returns the number of listeners subscribed to `class`.
    pub fn listener_count(&self, class: EventClass) -> usize {
        match class {
            EventClass::Update => self.update.len(),
            EventClass::Sync => self.sync.len(),
            EventClass::Error => self.error.len(),
        }
    }

    /// Notifies update listeners.
    pub fn emit_update(&self) {
        self.update.emit(&());
    }

    /// Notifies sync listeners.
    pub fn emit_sync(&self, status: SyncStatus) {
        self.sync.emit(&status);
    }

    /// Notifies error listeners.
    pub fn emit_error(&self, event: &ErrorEvent) {
        self.error.emit(event);
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNotifier")
            .field("update", &self.update.len())
            .field("sync", &self.sync.len())
            .field("error", &self.error.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn update_listeners_fire() {
        let notifier = EventNotifier::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        notifier.on_update(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        notifier.emit_update();
        notifier.emit_update();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn sync_listeners_receive_status() {
        let notifier = EventNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        notifier.on_sync(move |status| s.lock().push(status.as_str()));

        notifier.emit_sync(SyncStatus::InProgress);
        notifier.emit_sync(SyncStatus::Done);
        assert_eq!(*seen.lock(), vec!["INPROGRESS", "DONE"]);
    }

    #[test]
    fn error_events_carry_class_and_value() {
        let notifier = EventNotifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        notifier.on_error(move |event| {
            s.lock().push((
                event.class(),
                event.downcast_ref::<ClientError>().cloned(),
            ))
        });

        notifier.emit_error(&ErrorEvent::client(ClientError::ItemNotFound {
            id: "a1".into(),
        }));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, ErrorClass::Client);
        assert_eq!(
            seen[0].1,
            Some(ClientError::ItemNotFound { id: "a1".into() })
        );
    }

    #[test]
    fn remove_listener_by_id() {
        let notifier = EventNotifier::new();
        let id = notifier.on_update(|| {});
        assert_eq!(notifier.listener_count(EventClass::Update), 1);

        assert!(!notifier.remove_listener(EventClass::Sync, id));
        assert!(notifier.remove_listener(EventClass::Update, id));
        assert!(!notifier.remove_listener(EventClass::Update, id));
        assert_eq!(notifier.listener_count(EventClass::Update), 0);
    }

    #[test]
    fn listener_removing_itself_does_not_skip_siblings() {
        let notifier = Arc::new(EventNotifier::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let self_id = Arc::new(Mutex::new(None));

        let c = Arc::clone(&calls);
        notifier.on_update(move || c.lock().push("first"));

        let c = Arc::clone(&calls);
        let n = Arc::clone(&notifier);
        let slot = Arc::clone(&self_id);
        let id = notifier.on_update(move || {
            c.lock().push("self-removing");
            if let Some(id) = *slot.lock() {
                n.remove_listener(EventClass::Update, id);
            }
        });
        *self_id.lock() = Some(id);

        let c = Arc::clone(&calls);
        notifier.on_update(move || c.lock().push("last"));

        notifier.emit_update();
        notifier.emit_update();

        assert_eq!(
            *calls.lock(),
            vec!["first", "self-removing", "last", "first", "last"]
        );
    }

    #[test]
    fn listener_added_during_emit_waits_for_next() {
        let notifier = Arc::new(EventNotifier::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let n = Arc::clone(&notifier);
        let c = Arc::clone(&calls);
        notifier.on_sync(move |_| {
            let c = Arc::clone(&c);
            n.on_sync(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        });

        notifier.emit_sync(SyncStatus::Done);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        notifier.emit_sync(SyncStatus::Done);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

//! Pull and push round trips against the authority.

use crate::error::{SyncError, SyncResult};
use crate::transport::SessionTransport;
use formsync_core::{ErrorEvent, Snapshot, StateStore, SyncStatus};
use formsync_protocol::{Action, StateResponse, UpdateRequest};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The current state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No round trip has run yet.
    Idle,
    /// Fetching the full state.
    Pulling,
    /// Pushing queued actions.
    Pushing,
    /// The last round trip succeeded.
    Synced,
    /// The last round trip failed.
    Error,
}

impl SyncState {
    /// Returns true while a round trip is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Pulling | SyncState::Pushing)
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Successful full-state pulls.
    pub pulls_completed: u64,
    /// Successful pushes.
    pub pushes_completed: u64,
    /// Local actions delivered to the authority.
    pub actions_pushed: u64,
    /// Actions received from the authority.
    pub actions_received: u64,
    /// Failed round trips.
    pub failures: u64,
    /// Last successful round trip.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Drives pulls and pushes for one session.
///
/// Round trips are serialised: a pull and a push never overlap, and the
/// revision sent with a push is read only once the previous round trip
/// has been reconciled.
pub struct SyncCoordinator<T: SessionTransport> {
    session_id: String,
    transport: Arc<T>,
    store: Arc<StateStore>,
    gate: tokio::sync::Mutex<()>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<T: SessionTransport> SyncCoordinator<T> {
    /// Creates a coordinator for `session_id` that reconciles into `store`.
    pub fn new(session_id: impl Into<String>, transport: Arc<T>, store: Arc<StateStore>) -> Self {
        Self {
            session_id: session_id.into(),
            transport,
            store,
            gate: tokio::sync::Mutex::new(()),
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the session this coordinator talks for.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Fetches the full state and applies it.
    ///
    /// The authority's actions normally open with `RESET`, so the result
    /// replaces whatever the snapshot held.
    pub async fn pull(&self) -> SyncResult<Arc<Snapshot>> {
        let _round = self.gate.lock().await;

        self.set_state(SyncState::Pulling);
        self.store.events().emit_sync(SyncStatus::InProgress);
        debug!(session = %self.session_id, "pulling full state");

        let response = match self.transport.get_full_state(&self.session_id).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(err)),
        };

        let received = response.actions.len() as u64;
        let snapshot = self.reconcile(response);
        {
            let mut stats = self.stats.write();
            stats.pulls_completed += 1;
            stats.actions_received += received;
        }

        info!(session = %self.session_id, rev = snapshot.rev(), "pull complete");
        Ok(snapshot)
    }

    /// Sends `actions` with the current revision and applies the response.
    ///
    /// An empty batch returns the current snapshot without a round trip.
    pub async fn push(&self, actions: Vec<Action>) -> SyncResult<Arc<Snapshot>> {
        if actions.is_empty() {
            return Ok(self.store.snapshot());
        }

        let _round = self.gate.lock().await;

        let request = UpdateRequest::new(self.session_id.clone(), actions, self.store.rev());
        let pushed = request.actions.len() as u64;

        self.set_state(SyncState::Pushing);
        self.store.events().emit_sync(SyncStatus::InProgress);
        debug!(
            session = %self.session_id,
            actions = pushed,
            rev = request.rev,
            "pushing actions"
        );

        let response = match self.transport.update(&request).await {
            Ok(response) => response,
            Err(err) => return Err(self.fail(err)),
        };

        let received = response.actions.len() as u64;
        let snapshot = self.reconcile(response);
        {
            let mut stats = self.stats.write();
            stats.pushes_completed += 1;
            stats.actions_pushed += pushed;
            stats.actions_received += received;
        }

        info!(session = %self.session_id, rev = snapshot.rev(), "push complete");
        Ok(snapshot)
    }

    fn reconcile(&self, response: StateResponse) -> Arc<Snapshot> {
        let current = self.store.rev();
        if response.rev < current {
            warn!(
                session = %self.session_id,
                current,
                received = response.rev,
                "authority returned an older revision"
            );
        }

        let snapshot = self.store.dispatch(&response.actions, Some(response.rev));

        self.set_state(SyncState::Synced);
        {
            let mut stats = self.stats.write();
            stats.last_sync_time = Some(Instant::now());
            stats.last_error = None;
        }
        self.store.events().emit_sync(SyncStatus::Done);
        snapshot
    }

    fn fail(&self, err: SyncError) -> SyncError {
        self.set_state(SyncState::Error);
        {
            let mut stats = self.stats.write();
            stats.failures += 1;
            stats.last_error = Some(err.to_string());
        }

        warn!(session = %self.session_id, error = %err, "sync failed");
        self.store.events().emit_error(&ErrorEvent::sync(err.clone()));
        err
    }
}

impl<T: SessionTransport> std::fmt::Debug for SyncCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

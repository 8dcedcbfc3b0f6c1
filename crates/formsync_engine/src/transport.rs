//! Transport layer abstraction for session sync.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use formsync_protocol::{StateResponse, UpdateRequest};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A session transport handles communication with the remote authority.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, WebSocket, in-process server, mock for testing).
/// Retries, authentication and wire encoding are the implementation's
/// business.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Fetches the full current state of a session.
    async fn get_full_state(&self, session_id: &str) -> SyncResult<StateResponse>;

    /// Sends a batch of local actions and returns the authority's
    /// canonical response.
    async fn update(&self, request: &UpdateRequest) -> SyncResult<StateResponse>;
}

#[async_trait]
impl<T: SessionTransport + ?Sized> SessionTransport for Arc<T> {
    async fn get_full_state(&self, session_id: &str) -> SyncResult<StateResponse> {
        (**self).get_full_state(session_id).await
    }

    async fn update(&self, request: &UpdateRequest) -> SyncResult<StateResponse> {
        (**self).update(request).await
    }
}

/// A mock transport for testing.
///
/// Full-state requests answer with the configured state. Update requests
/// answer with the next scripted response or, when none is queued, echo
/// the request's actions back with the revision bumped by one.
pub struct MockTransport {
    connected: AtomicBool,
    latency: Mutex<Duration>,
    full_state: Mutex<Option<StateResponse>>,
    update_responses: Mutex<VecDeque<SyncResult<StateResponse>>>,
    update_requests: Mutex<Vec<UpdateRequest>>,
    calls: Mutex<Vec<&'static str>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            latency: Mutex::new(Duration::ZERO),
            full_state: Mutex::new(None),
            update_responses: Mutex::new(VecDeque::new()),
            update_requests: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sets the full-state response.
    pub fn set_full_state(&self, response: StateResponse) {
        *self.full_state.lock() = Some(response);
    }

    /// Queues a response for the next update request.
    pub fn push_update_response(&self, response: SyncResult<StateResponse>) {
        self.update_responses.lock().push_back(response);
    }

    /// Sets the simulated round-trip latency.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Returns every update request received so far.
    pub fn update_requests(&self) -> Vec<UpdateRequest> {
        self.update_requests.lock().clone()
    }

    /// Returns the transport calls made so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    /// Returns the highest number of overlapping calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn round_trip<F>(&self, call: &'static str, respond: F) -> SyncResult<StateResponse>
    where
        F: FnOnce() -> SyncResult<StateResponse>,
    {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SyncError::NotConnected);
        }

        self.calls.lock().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        respond()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionTransport for MockTransport {
    async fn get_full_state(&self, _session_id: &str) -> SyncResult<StateResponse> {
        self.round_trip("get_full_state", || {
            self.full_state
                .lock()
                .clone()
                .ok_or_else(|| SyncError::Protocol("No mock full state set".into()))
        })
        .await
    }

    async fn update(&self, request: &UpdateRequest) -> SyncResult<StateResponse> {
        self.update_requests.lock().push(request.clone());
        self.round_trip("update", || {
            self.update_responses.lock().pop_front().unwrap_or_else(|| {
                Ok(StateResponse::new(request.actions.clone(), request.rev + 1))
            })
        })
        .await
    }
}

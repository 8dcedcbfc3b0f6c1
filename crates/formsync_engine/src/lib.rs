//! # formsync Engine
//!
//! Optimistic action queue and sync coordinator for formsync sessions.
//!
//! This crate provides:
//! - `Session`, the public face of one remote session: queries, answer
//!   and navigation calls, event subscriptions
//! - The action queue with a trailing-edge debounce timer
//! - `SyncCoordinator`, which drives full-state pulls and
//!   push-and-reconcile rounds against a `SessionTransport`
//! - `MockTransport` for tests
//!
//! ## Architecture
//!
//! Local intents are applied to the snapshot immediately (optimistic) and
//! queued. After a quiet period the queue is swept and pushed together with
//! the last known revision. The authority answers with its own canonical
//! actions and a new revision, which are applied on top of the current
//! snapshot.
//!
//! ## Key Invariants
//!
//! - Server is authoritative: its response always replaces the optimistic
//!   effect of the batch it answers
//! - Local actions never change the revision
//! - At most one round trip (pull or push) is in flight per session
//! - Flushing an empty queue never touches the network

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod coordinator;
mod error;
mod queue;
mod session;
mod transport;

pub use config::{SessionConfig, DEFAULT_DEBOUNCE};
pub use coordinator::{SyncCoordinator, SyncState, SyncStats};
pub use error::{SyncError, SyncResult};
pub use queue::{ActionQueue, Debouncer};
pub use session::Session;
pub use transport::{MockTransport, SessionTransport};

pub use formsync_core::{ErrorClass, ErrorEvent, EventClass, ListenerId, Snapshot, SyncStatus};

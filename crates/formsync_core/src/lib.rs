//! # formsync Core
//!
//! Client-side session state for formsync.
//!
//! This crate provides:
//! - `Snapshot`, the immutable session state at one point in time
//! - The reducer that turns a snapshot plus an ordered action batch into
//!   the next snapshot, keeping the reverse-reference index consistent
//! - `StateStore`, which installs each reduced snapshot atomically and
//!   notifies subscribers
//! - `EventNotifier`, the fan-out for update, sync and error events
//!
//! ## Key Invariants
//!
//! - `reverse_items[child]` contains `parent` iff `parent` is a container
//!   listing `child`. The one exception is a container that lists a child
//!   twice: removing that child drops its reverse entry while the later
//!   occurrences stay listed
//! - Snapshots are never mutated once published; readers holding an old
//!   `Arc<Snapshot>` are unaffected by later transitions
//! - A batch is visible entirely or not at all
//! - Local actions never change the revision

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod events;
pub mod reducer;
mod snapshot;
mod store;

pub use error::{ClientError, CoreResult};
pub use events::{ErrorClass, ErrorEvent, EventClass, EventNotifier, ListenerId, SyncStatus};
pub use reducer::Reduction;
pub use snapshot::Snapshot;
pub use store::StateStore;

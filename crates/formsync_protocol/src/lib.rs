//! # formsync Protocol
//!
//! Session items, actions and request/response messages for formsync.
//!
//! This crate provides:
//! - `Item`, `ValueSet` and `ErrorRecord`, the payloads a session is built from
//! - `Action`, the tagged instruction describing one state transition
//! - `StateResponse` / `UpdateRequest`, the contract with a session transport
//! - JSON encoding/decoding of the above
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod error;
mod item;
mod messages;

pub use action::Action;
pub use error::{ProtocolError, ProtocolResult};
pub use item::{ErrorRecord, Item, ItemId, ItemKind, ValueSet};
pub use messages::{FullStateRequest, StateResponse, UpdateRequest};

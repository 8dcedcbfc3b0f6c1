//! # formsync Server
//!
//! In-memory reference authority for formsync sessions.
//!
//! This crate provides:
//! - Session hosting built from a form definition (items, value sets,
//!   locale)
//! - The full-state and update endpoints, typed or JSON-encoded
//! - Answer canonicalisation and validation, page navigation
//!
//! # Protocol
//!
//! 1. The client fetches the full state: `RESET` followed by everything
//!    needed to rebuild the session, plus the current revision.
//! 2. The client sends batches of local intents with the revision it
//!    believes it is at.
//! 3. The server answers each batch with canonical actions and the next
//!    revision. A client that fell behind receives the full state instead.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod registry;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use registry::{HostedSession, SessionRegistry, INITIAL_REV};
pub use server::SessionServer;

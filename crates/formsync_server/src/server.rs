//! The reference authority.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{HandlerContext, RequestHandler};
use crate::registry::{HostedSession, SessionRegistry};
use formsync_core::Snapshot;
use formsync_protocol::{FullStateRequest, Item, StateResponse, UpdateRequest, ValueSet};
use std::sync::Arc;
use tracing::info;

/// An in-memory authority hosting any number of sessions.
///
/// # Example
///
/// ```
/// use formsync_protocol::{Action, Item, UpdateRequest};
/// use formsync_server::{ServerConfig, SessionServer};
/// use serde_json::json;
///
/// let server = SessionServer::new(ServerConfig::default());
/// server
///     .create_session(
///         "s1",
///         vec![Item::questionnaire("root", ["age"]), Item::new("age", "integer")],
///         Vec::new(),
///         None,
///     )
///     .unwrap();
///
/// let request = UpdateRequest::new("s1", vec![Action::answer("age", json!(42))], 1);
/// let response = server.handle_update(request).unwrap();
/// assert_eq!(response.rev, 2);
/// ```
pub struct SessionServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SessionServer {
    /// Creates a new server with no sessions.
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let context = Arc::new(HandlerContext::new(config, registry));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Hosts a new session built from a form definition.
    ///
    /// Returns the session's starting revision.
    pub fn create_session(
        &self,
        id: impl Into<String>,
        items: Vec<Item>,
        value_sets: Vec<ValueSet>,
        locale: Option<String>,
    ) -> ServerResult<u64> {
        let id = id.into();
        let session = HostedSession::build(items, value_sets, locale)?;
        let rev = session.rev();
        self.context.registry.insert(id.clone(), session)?;

        info!(session = %id, rev, "session created");
        Ok(rev)
    }

    /// Handles a full-state request.
    pub fn handle_get_full_state(&self, session_id: &str) -> ServerResult<StateResponse> {
        self.handler
            .handle_get_full_state(FullStateRequest::new(session_id))
    }

    /// Handles an update request.
    pub fn handle_update(&self, request: UpdateRequest) -> ServerResult<StateResponse> {
        self.handler.handle_update(request)
    }

    /// Handles a JSON-encoded full-state request.
    pub fn handle_get_full_state_json(&self, body: &[u8]) -> ServerResult<Vec<u8>> {
        let request = FullStateRequest::decode(body)?;
        Ok(self.handler.handle_get_full_state(request)?.encode()?)
    }

    /// Handles a JSON-encoded update request.
    pub fn handle_update_json(&self, body: &[u8]) -> ServerResult<Vec<u8>> {
        let request = UpdateRequest::decode(body)?;
        Ok(self.handler.handle_update(request)?.encode()?)
    }

    /// Returns a session's current revision.
    pub fn rev(&self, session_id: &str) -> Option<u64> {
        self.context
            .registry
            .with_session(session_id, HostedSession::rev)
            .ok()
    }

    /// Returns a session's page cursor.
    pub fn page(&self, session_id: &str) -> Option<usize> {
        self.context
            .registry
            .with_session(session_id, HostedSession::page)
            .ok()
    }

    /// Returns a copy of a session's authoritative snapshot.
    pub fn snapshot(&self, session_id: &str) -> Option<Snapshot> {
        self.context
            .registry
            .with_session(session_id, |session| session.snapshot().clone())
            .ok()
    }

    /// Returns the number of hosted sessions.
    pub fn session_count(&self) -> usize {
        self.context.registry.len()
    }
}

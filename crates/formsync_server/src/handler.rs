//! Request handlers for the session endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::registry::SessionRegistry;
use formsync_protocol::{FullStateRequest, StateResponse, UpdateRequest};
use std::sync::Arc;
use tracing::debug;

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Hosted sessions (shared across all handlers).
    pub registry: Arc<SessionRegistry>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, registry: Arc<SessionRegistry>) -> Self {
        Self { config, registry }
    }
}

/// Handler for session requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a full-state request.
    pub fn handle_get_full_state(&self, request: FullStateRequest) -> ServerResult<StateResponse> {
        self.context
            .registry
            .with_session(&request.session_id, |session| {
                StateResponse::new(session.full_state(), session.rev())
            })
    }

    /// Handles an update request.
    ///
    /// Every accepted request moves the session forward by exactly one
    /// revision, whatever it contains.
    pub fn handle_update(&self, request: UpdateRequest) -> ServerResult<StateResponse> {
        let config = &self.context.config;
        if request.actions.len() > config.max_update_batch {
            return Err(ServerError::InvalidRequest(format!(
                "Too many actions: {} > {}",
                request.actions.len(),
                config.max_update_batch
            )));
        }

        self.context
            .registry
            .with_session_mut(&request.session_id, |session| {
                let current = session.rev();
                if request.rev > current {
                    return Err(ServerError::InvalidRequest(format!(
                        "revision {} is ahead of server revision {}",
                        request.rev, current
                    )));
                }

                let response = session.respond(&request.actions);
                let new_rev = current + 1;
                session.commit(&response, new_rev);

                if request.rev < current && config.resync_stale_clients {
                    debug!(
                        session = %request.session_id,
                        client_rev = request.rev,
                        server_rev = current,
                        "stale client, sending full state"
                    );
                    return Ok(StateResponse::new(session.full_state(), new_rev));
                }

                Ok(StateResponse::new(response, new_rev))
            })?
    }
}

//! Request and response messages exchanged with the remote authority.

use crate::action::Action;
use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// Request for the full current state of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullStateRequest {
    /// Session ID.
    pub session_id: String,
}

impl FullStateRequest {
    /// Creates a new full-state request.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let request: Self = serde_json::from_slice(bytes)?;
        if request.session_id.is_empty() {
            return Err(ProtocolError::invalid_structure("empty session_id"));
        }
        Ok(request)
    }
}

/// A batch of locally issued actions sent for reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Session ID.
    pub session_id: String,
    /// Actions issued since the last sync, in issue order.
    pub actions: Vec<Action>,
    /// Revision the client believes it is at.
    pub rev: u64,
}

impl UpdateRequest {
    /// Creates a new update request.
    pub fn new(session_id: impl Into<String>, actions: Vec<Action>, rev: u64) -> Self {
        Self {
            session_id: session_id.into(),
            actions,
            rev,
        }
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let request: Self = serde_json::from_slice(bytes)?;
        if request.session_id.is_empty() {
            return Err(ProtocolError::invalid_structure("empty session_id"));
        }
        Ok(request)
    }
}

/// The authority's answer to a full-state or update request.
///
/// `actions` are the canonical transitions to apply on top of the client's
/// current snapshot and `rev` is the revision that state corresponds to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateResponse {
    /// Canonical actions.
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Authoritative revision.
    pub rev: u64,
}

impl StateResponse {
    /// Creates a new state response.
    pub fn new(actions: Vec<Action>, rev: u64) -> Self {
        Self { actions, rev }
    }

    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes from JSON.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

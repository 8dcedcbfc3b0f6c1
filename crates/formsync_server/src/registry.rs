//! Hosted session state.

use crate::error::{ServerError, ServerResult};
use formsync_core::{reducer, Snapshot};
use formsync_protocol::{Action, ErrorRecord, Item, ItemKind, ValueSet};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Revision a freshly created session starts at.
pub const INITIAL_REV: u64 = 1;

/// One session as the authority sees it.
///
/// The hosted snapshot is reduced with the same reducer the clients use,
/// from exactly the actions sent back to them, so a client that applies
/// every response ends up with the same state.
#[derive(Debug, Clone)]
pub struct HostedSession {
    snapshot: Snapshot,
    page: usize,
}

impl HostedSession {
    /// Builds a session from its form definition.
    pub fn build(
        items: Vec<Item>,
        value_sets: Vec<ValueSet>,
        locale: Option<String>,
    ) -> ServerResult<Self> {
        let mut actions = vec![Action::Reset];
        actions.extend(locale.map(Action::locale));
        actions.extend(value_sets.into_iter().map(Action::value_set));
        actions.extend(items.into_iter().map(Action::item));

        let reduction = reducer::apply(&Snapshot::new(), &actions, Some(INITIAL_REV));
        if let Some(err) = reduction.rejected.first() {
            return Err(ServerError::InvalidRequest(err.to_string()));
        }

        Ok(Self {
            snapshot: reduction.snapshot,
            page: 0,
        })
    }

    /// Returns the authoritative snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Returns the current revision.
    pub fn rev(&self) -> u64 {
        self.snapshot.rev()
    }

    /// Returns the page cursor.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Returns the root questionnaire: the first one no container lists.
    pub fn root(&self) -> Option<&Item> {
        self.snapshot.items().find(|item| {
            item.kind == ItemKind::Questionnaire
                && self.snapshot.parents_of(&item.id).is_none()
        })
    }

    /// Returns the number of pages, one per child of the root.
    pub fn page_count(&self) -> usize {
        self.root().map_or(0, |root| root.children().len())
    }

    /// Describes the whole session as actions:
    /// `RESET, LOCALE?, VALUE_SET*, ITEM*, ERROR*, COMPLETE?`.
    pub fn full_state(&self) -> Vec<Action> {
        let s = &self.snapshot;
        let mut actions = vec![Action::Reset];
        actions.extend(s.locale().map(Action::locale));
        actions.extend(s.value_sets().cloned().map(Action::value_set));
        actions.extend(s.items().cloned().map(Action::item));
        actions.extend(s.errors().iter().cloned().map(Action::error));
        if s.is_complete() {
            actions.push(Action::Complete);
        }
        actions
    }

    /// Turns client intents into the canonical response actions.
    ///
    /// Navigation moves the page cursor immediately; everything else only
    /// takes effect once the response is [committed](Self::commit).
    pub fn respond(&mut self, intents: &[Action]) -> Vec<Action> {
        let mut working = self.snapshot.clone();
        let mut response = Vec::with_capacity(intents.len());

        for intent in intents {
            match intent {
                Action::Answer { id, value } => {
                    let answer = Action::answer(id.clone(), canonical_value(value));
                    match reducer::apply_action(&mut working, &answer) {
                        Ok(()) => {
                            if let Some(item) = working.item(id) {
                                response.push(Action::item(item.clone()));
                            }
                        }
                        Err(err) => response.push(Action::error(
                            ErrorRecord::new("invalid_answer", err.to_string())
                                .with_detail("item", Value::String(id.clone())),
                        )),
                    }
                }
                Action::Complete => response.push(Action::Complete),
                Action::Next => {
                    let last = self.page_count().saturating_sub(1);
                    self.page = (self.page + 1).min(last);
                }
                Action::Previous => self.page = self.page.saturating_sub(1),
                other => response.push(Action::error(ErrorRecord::new(
                    "unexpected_action",
                    format!("{} is not a client action", other.kind()),
                ))),
            }
        }

        response
    }

    /// Applies response actions and moves to `rev`.
    pub fn commit(&mut self, response: &[Action], rev: u64) {
        let reduction = reducer::apply(&self.snapshot, response, Some(rev));
        for err in &reduction.rejected {
            warn!(error = %err, "authority produced an action it could not apply");
        }
        self.snapshot = reduction.snapshot;
    }
}

/// Normalises an answer value: strings are trimmed, everything else is kept.
fn canonical_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    }
}

/// All sessions hosted by one server.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, HostedSession>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts a new session.
    pub fn insert(&self, id: impl Into<String>, session: HostedSession) -> ServerResult<()> {
        let id = id.into();
        let mut sessions = self.sessions.write();
        if sessions.contains_key(&id) {
            return Err(ServerError::SessionExists(id));
        }
        sessions.insert(id, session);
        Ok(())
    }

    /// Returns the number of hosted sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no session is hosted.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Runs `f` against a hosted session.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&HostedSession) -> R) -> ServerResult<R> {
        self.sessions
            .read()
            .get(id)
            .map(f)
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
    }

    /// Runs `f` against a hosted session with exclusive access.
    pub fn with_session_mut<R>(
        &self,
        id: &str,
        f: impl FnOnce(&mut HostedSession) -> R,
    ) -> ServerResult<R> {
        self.sessions
            .write()
            .get_mut(id)
            .map(f)
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
    }
}

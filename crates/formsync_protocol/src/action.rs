//! Session actions.

use crate::error::ProtocolResult;
use crate::item::{ErrorRecord, Item, ItemId, ValueSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tagged instruction describing one state transition.
///
/// Actions flow in both directions: clients send intents (`ANSWER`,
/// `COMPLETE`, `NEXT`, `PREVIOUS`) and the remote authority answers with
/// the canonical transitions (`RESET`, `ITEM`, `REMOVE_ITEMS`, ...).
///
/// # Wire format
///
/// Actions are JSON objects tagged by `type`:
///
/// ```
/// use formsync_protocol::Action;
///
/// let action: Action = serde_json::from_str(r#"{"type":"ANSWER","id":"a1","value":"hello"}"#).unwrap();
/// assert_eq!(action.kind(), "ANSWER");
/// ```
///
/// Tags this version does not know decode to [`Action::Unknown`] so that a
/// newer server never breaks batch decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Clears all session state except the revision.
    Reset,
    /// Sets the answer of an answerable item.
    Answer {
        /// Target item ID.
        id: ItemId,
        /// New answer value.
        value: Value,
    },
    /// Inserts or replaces an item.
    Item {
        /// The item.
        item: Item,
    },
    /// Appends a server-reported error record.
    Error {
        /// The error record.
        error: ErrorRecord,
    },
    /// Sets the active locale.
    Locale {
        /// Locale tag, e.g. `en-GB`.
        value: String,
    },
    /// Inserts or replaces a value set.
    ValueSet {
        /// The value set.
        value_set: ValueSet,
    },
    /// Removes items and unlinks them from their parents.
    RemoveItems {
        /// IDs of the items to remove.
        ids: Vec<ItemId>,
    },
    /// Marks the session complete.
    Complete,
    /// Navigation marker: advance to the next page.
    Next,
    /// Navigation marker: go back to the previous page.
    Previous,
    /// An action tag this version does not understand.
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Creates an `ANSWER` action.
    pub fn answer(id: impl Into<ItemId>, value: Value) -> Self {
        Action::Answer {
            id: id.into(),
            value,
        }
    }

    /// Creates an `ITEM` action.
    pub fn item(item: Item) -> Self {
        Action::Item { item }
    }

    /// Creates an `ERROR` action.
    pub fn error(error: ErrorRecord) -> Self {
        Action::Error { error }
    }

    /// Creates a `LOCALE` action.
    pub fn locale(value: impl Into<String>) -> Self {
        Action::Locale {
            value: value.into(),
        }
    }

    /// Creates a `VALUE_SET` action.
    pub fn value_set(value_set: ValueSet) -> Self {
        Action::ValueSet { value_set }
    }

    /// Creates a `REMOVE_ITEMS` action.
    pub fn remove_items<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        Action::RemoveItems {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the wire tag of this action.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Reset => "RESET",
            Action::Answer { .. } => "ANSWER",
            Action::Item { .. } => "ITEM",
            Action::Error { .. } => "ERROR",
            Action::Locale { .. } => "LOCALE",
            Action::ValueSet { .. } => "VALUE_SET",
            Action::RemoveItems { .. } => "REMOVE_ITEMS",
            Action::Complete => "COMPLETE",
            Action::Next => "NEXT",
            Action::Previous => "PREVIOUS",
            Action::Unknown => "UNKNOWN",
        }
    }

    /// Returns true if this is an action a client may send as an intent.
    pub fn is_client_intent(&self) -> bool {
        matches!(
            self,
            Action::Answer { .. } | Action::Complete | Action::Next | Action::Previous
        )
    }

    /// Encodes a batch of actions as a JSON array.
    pub fn encode_batch(actions: &[Action]) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(actions)?)
    }

    /// Decodes a JSON array of actions.
    pub fn decode_batch(bytes: &[u8]) -> ProtocolResult<Vec<Action>> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

//! Session items, value sets and server-reported error records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of an item within a session.
pub type ItemId = String;

/// The kind of an item.
///
/// On the wire the kind is the item's `type` string. The three container
/// kinds carry child items, `note` is display-only, and every other kind
/// accepts an answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    /// Root of a session.
    Questionnaire,
    /// Ordered group of items.
    Group,
    /// Group answered as a survey grid.
    SurveyGroup,
    /// Display-only text.
    Note,
    /// Any answerable kind, named as the server names it (`text`, `choice`, ...).
    Answerable(String),
}

impl ItemKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            ItemKind::Questionnaire => "questionnaire",
            ItemKind::Group => "group",
            ItemKind::SurveyGroup => "surveygroup",
            ItemKind::Note => "note",
            ItemKind::Answerable(name) => name,
        }
    }

    /// Returns true if items of this kind carry children.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ItemKind::Questionnaire | ItemKind::Group | ItemKind::SurveyGroup
        )
    }

    /// Returns true if items of this kind accept an answer.
    pub fn is_answerable(&self) -> bool {
        matches!(self, ItemKind::Answerable(_))
    }
}

impl From<String> for ItemKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "questionnaire" => ItemKind::Questionnaire,
            "group" => ItemKind::Group,
            "surveygroup" => ItemKind::SurveyGroup,
            "note" => ItemKind::Note,
            _ => ItemKind::Answerable(name),
        }
    }
}

impl From<&str> for ItemKind {
    fn from(name: &str) -> Self {
        ItemKind::from(name.to_string())
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Answerable(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node of a session's item tree.
///
/// Container kinds list their children in `items`; this list is the
/// forward edge set of the tree. Answerable kinds carry their current
/// answer in `value`. Everything else the server sends about an item
/// (labels, required flags, value-set references) is kept in
/// `attributes` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item ID.
    pub id: ItemId,
    /// Item kind.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Child item IDs, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ItemId>,
    /// Current answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Remaining attributes, carried opaquely.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Item {
    /// Creates an item of the given kind with no children and no value.
    pub fn new(id: impl Into<ItemId>, kind: impl Into<ItemKind>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            items: Vec::new(),
            value: None,
            attributes: Map::new(),
        }
    }

    /// Creates a questionnaire with the given children.
    pub fn questionnaire<I, S>(id: impl Into<ItemId>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        Self::new(id, ItemKind::Questionnaire).with_children(children)
    }

    /// Creates a group with the given children.
    pub fn group<I, S>(id: impl Into<ItemId>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        Self::new(id, ItemKind::Group).with_children(children)
    }

    /// Creates a note.
    pub fn note(id: impl Into<ItemId>) -> Self {
        Self::new(id, ItemKind::Note)
    }

    /// Replaces the children list.
    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        self.items = children.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the answer value. `null` leaves the item unanswered.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = (!value.is_null()).then_some(value);
        self
    }

    /// Sets an opaque attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Returns the children that count as forward edges.
    ///
    /// Only container kinds have children; a stray `items` list on any
    /// other kind is ignored.
    pub fn children(&self) -> &[ItemId] {
        if self.kind.is_container() {
            &self.items
        } else {
            &[]
        }
    }

    /// Returns true if this item is a container.
    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }

    /// Returns true if this item accepts an answer.
    pub fn is_answerable(&self) -> bool {
        self.kind.is_answerable()
    }
}

/// An enumeration referenced by answerable items for constrained values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSet {
    /// Value set ID.
    pub id: String,
    /// Set content (codes, displays, ...), carried opaquely.
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

impl ValueSet {
    /// Creates an empty value set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Map::new(),
        }
    }

    /// Sets a content field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.content.insert(key.into(), value);
        self
    }
}

/// A problem reported by the remote authority, such as a failed validation.
///
/// Error records are session data: they accumulate in the snapshot and are
/// never raised as faults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Machine-readable code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Remaining fields, carried opaquely.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ErrorRecord {
    /// Creates an error record with a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
            details: Map::new(),
        }
    }

    /// Sets a detail field.
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

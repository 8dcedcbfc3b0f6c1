//! Snapshot rendering shared by the commands.

use formsync_core::Snapshot;
use formsync_protocol::{ErrorRecord, Item, ItemId, ValueSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Serializable view of a snapshot.
#[derive(Debug, Serialize)]
pub struct SnapshotReport<'a> {
    /// Revision.
    pub rev: u64,
    /// Whether the session is complete.
    pub complete: bool,
    /// Active locale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<&'a str>,
    /// Items in ID order.
    pub items: Vec<&'a Item>,
    /// Value sets in ID order.
    pub value_sets: Vec<&'a ValueSet>,
    /// Child ID -> parent IDs.
    pub reverse_items: &'a BTreeMap<ItemId, BTreeSet<ItemId>>,
    /// Server-reported errors.
    pub errors: &'a [ErrorRecord],
}

impl<'a> SnapshotReport<'a> {
    /// Builds a report over `snapshot`.
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            rev: snapshot.rev(),
            complete: snapshot.is_complete(),
            locale: snapshot.locale(),
            items: snapshot.items().collect(),
            value_sets: snapshot.value_sets().collect(),
            reverse_items: snapshot.reverse_items(),
            errors: snapshot.errors(),
        }
    }

    /// Renders the report as indented text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Revision:   {}\n", self.rev));
        out.push_str(&format!("Complete:   {}\n", self.complete));
        out.push_str(&format!("Locale:     {}\n", self.locale.unwrap_or("-")));
        out.push_str(&format!("Value sets: {}\n", self.value_sets.len()));

        out.push_str(&format!("\nItems ({}):\n", self.items.len()));
        for item in &self.items {
            let value = item
                .value
                .as_ref()
                .map(|v| format!(" = {v}"))
                .unwrap_or_default();
            out.push_str(&format!("  {} [{}]{}\n", item.id, item.kind, value));
            if !item.children().is_empty() {
                out.push_str(&format!("    children: {}\n", item.children().join(", ")));
            }
        }

        if !self.errors.is_empty() {
            out.push_str(&format!("\nErrors ({}):\n", self.errors.len()));
            for error in self.errors {
                out.push_str(&format!(
                    "  {}: {}\n",
                    error.code.as_deref().unwrap_or("-"),
                    error.message.as_deref().unwrap_or("")
                ));
            }
        }

        out
    }
}

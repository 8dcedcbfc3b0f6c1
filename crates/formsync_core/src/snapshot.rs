//! Immutable session state.

use crate::error::{ClientError, CoreResult};
use formsync_protocol::{ErrorRecord, Item, ItemId, ValueSet};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The full client-visible session state at one point in time.
///
/// A snapshot is a value: the store replaces it wholesale on every
/// transition and never mutates a published one. Items and value sets are
/// shared between consecutive snapshots through `Arc` and copied only when
/// a transition touches them.
///
/// # Invariants
///
/// - Every reverse edge is real: if `reverse_items[child]` contains
///   `parent`, then `items[parent]` is a container listing `child`
/// - The converse holds too, unless a container listed the same child
///   more than once when that child was removed. `REMOVE_ITEMS` drops only
///   the first occurrence but deletes the whole reverse entry, so the
///   remaining duplicates have no reverse edge until the container is
///   upserted again
/// - Reverse entries are never empty sets
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Items by ID.
    items: BTreeMap<ItemId, Arc<Item>>,
    /// Child ID -> IDs of the containers listing it.
    reverse_items: BTreeMap<ItemId, BTreeSet<ItemId>>,
    /// Value sets by ID.
    value_sets: BTreeMap<String, Arc<ValueSet>>,
    /// Server-reported errors in arrival order.
    errors: Vec<ErrorRecord>,
    /// Active locale.
    locale: Option<String>,
    /// Authoritative revision.
    rev: u64,
    /// Whether the session has been marked complete.
    complete: bool,
}

impl Snapshot {
    /// Creates an empty snapshot at revision 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets an item by ID.
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id).map(Arc::as_ref)
    }

    /// Gets a shared handle to an item.
    pub fn item_arc(&self, id: &str) -> Option<Arc<Item>> {
        self.items.get(id).cloned()
    }

    /// Iterates over all items in ID order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values().map(Arc::as_ref)
    }

    /// Returns the number of items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the IDs of the containers listing `id` as a child.
    pub fn parents_of(&self, id: &str) -> Option<&BTreeSet<ItemId>> {
        self.reverse_items.get(id)
    }

    /// Returns the whole reverse-reference index.
    pub fn reverse_items(&self) -> &BTreeMap<ItemId, BTreeSet<ItemId>> {
        &self.reverse_items
    }

    /// Gets a value set by ID.
    pub fn value_set(&self, id: &str) -> Option<&ValueSet> {
        self.value_sets.get(id).map(Arc::as_ref)
    }

    /// Gets a shared handle to a value set.
    pub fn value_set_arc(&self, id: &str) -> Option<Arc<ValueSet>> {
        self.value_sets.get(id).cloned()
    }

    /// Iterates over all value sets in ID order.
    pub fn value_sets(&self) -> impl Iterator<Item = &ValueSet> {
        self.value_sets.values().map(Arc::as_ref)
    }

    /// Returns the accumulated server-reported errors.
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Returns the active locale.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Returns the authoritative revision.
    pub fn rev(&self) -> u64 {
        self.rev
    }

    /// Returns true if the session has been marked complete.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Recomputes the reverse index from the items' forward edges.
    pub fn derive_reverse_items(&self) -> BTreeMap<ItemId, BTreeSet<ItemId>> {
        let mut derived: BTreeMap<ItemId, BTreeSet<ItemId>> = BTreeMap::new();
        for (parent_id, item) in &self.items {
            for child in item.children() {
                derived
                    .entry(child.clone())
                    .or_default()
                    .insert(parent_id.clone());
            }
        }
        derived
    }

    /// Returns true if the reverse index is exactly the inverse of the
    /// containment graph.
    ///
    /// This is false after removing a child that some container listed
    /// more than once; see the type-level invariants.
    pub fn reverse_index_consistent(&self) -> bool {
        self.reverse_items == self.derive_reverse_items()
    }

    // --- transitions, driven by the reducer ---

    pub(crate) fn reset(&mut self) {
        *self = Self {
            rev: self.rev,
            ..Self::default()
        };
    }

    pub(crate) fn set_rev(&mut self, rev: u64) {
        self.rev = rev;
    }

    pub(crate) fn answer(&mut self, id: &str, value: Value) -> CoreResult<()> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| ClientError::ItemNotFound { id: id.to_string() })?;

        if !item.is_answerable() {
            return Err(ClientError::NotAnswerable {
                id: id.to_string(),
                kind: item.kind.to_string(),
            });
        }

        // `null` clears the answer, matching how it decodes off the wire.
        Arc::make_mut(item).value = (!value.is_null()).then_some(value);
        Ok(())
    }

    /// Upserts an item and reconciles its reverse edges against the
    /// previous version's children.
    pub(crate) fn upsert_item(&mut self, item: Item) {
        let old_children: BTreeSet<ItemId> = self
            .items
            .get(&item.id)
            .map(|old| old.children().iter().cloned().collect())
            .unwrap_or_default();
        let new_children: BTreeSet<ItemId> = item.children().iter().cloned().collect();

        for stale in old_children.difference(&new_children) {
            self.unlink(stale, &item.id);
        }
        for child in &new_children {
            self.reverse_items
                .entry(child.clone())
                .or_default()
                .insert(item.id.clone());
        }

        self.items.insert(item.id.clone(), Arc::new(item));
    }

    /// Removes an item, detaches it from every parent that lists it and
    /// drops the reverse edges it owned as a parent.
    pub(crate) fn remove_item(&mut self, id: &str) {
        let removed = self.items.remove(id);

        if let Some(parents) = self.reverse_items.remove(id) {
            for parent_id in parents {
                let Some(parent) = self.items.get_mut(&parent_id) else {
                    continue;
                };
                if !parent.is_container() {
                    continue;
                }
                if let Some(pos) = parent.items.iter().position(|child| child == id) {
                    Arc::make_mut(parent).items.remove(pos);
                }
            }
        }

        if let Some(removed) = removed {
            for child in removed.children() {
                self.unlink(child, id);
            }
        }
    }

    pub(crate) fn push_error(&mut self, error: ErrorRecord) {
        self.errors.push(error);
    }

    pub(crate) fn set_locale(&mut self, locale: String) {
        self.locale = Some(locale);
    }

    pub(crate) fn upsert_value_set(&mut self, value_set: ValueSet) {
        self.value_sets
            .insert(value_set.id.clone(), Arc::new(value_set));
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    fn unlink(&mut self, child: &str, parent: &str) {
        if let Some(parents) = self.reverse_items.get_mut(child) {
            parents.remove(parent);
            if parents.is_empty() {
                self.reverse_items.remove(child);
            }
        }
    }
}

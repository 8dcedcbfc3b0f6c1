//! The action reducer.
//!
//! [`apply`] is a pure function from a snapshot and an ordered action batch
//! to the next snapshot. It never touches the input snapshot; the caller
//! decides when (and whether) to publish the result. Notification is the
//! [`StateStore`](crate::StateStore)'s job.
//!
//! ## Batch semantics
//!
//! - Actions apply in list order against the in-progress snapshot, so a
//!   later action always sees the effects of the earlier ones.
//! - A revision supplied by the authority is stamped *before* the actions
//!   run, so it is visible even when some actions are rejected.
//! - A rejected action is skipped and reported; the rest of the batch
//!   still applies.

use crate::error::{ClientError, CoreResult};
use crate::snapshot::Snapshot;
use formsync_protocol::Action;
use tracing::{trace, warn};

/// The outcome of reducing one action batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// The snapshot after the batch.
    pub snapshot: Snapshot,
    /// Errors raised by the actions that were skipped, in batch order.
    pub rejected: Vec<ClientError>,
}

impl Reduction {
    /// Returns true if every action applied cleanly.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Applies an ordered batch of actions to a snapshot.
pub fn apply(snapshot: &Snapshot, actions: &[Action], new_rev: Option<u64>) -> Reduction {
    let mut next = snapshot.clone();
    if let Some(rev) = new_rev {
        next.set_rev(rev);
    }

    let mut rejected = Vec::new();
    for action in actions {
        if let Err(err) = apply_action(&mut next, action) {
            warn!(action = action.kind(), error = %err, "action rejected");
            rejected.push(err);
        }
    }

    Reduction {
        snapshot: next,
        rejected,
    }
}

/// Applies a single action to an in-progress snapshot.
///
/// On error the snapshot is left untouched.
pub fn apply_action(snapshot: &mut Snapshot, action: &Action) -> CoreResult<()> {
    trace!(action = action.kind(), "applying action");

    match action {
        Action::Reset => snapshot.reset(),
        Action::Answer { id, value } => snapshot.answer(id, value.clone())?,
        Action::Item { item } => snapshot.upsert_item(item.clone()),
        Action::Error { error } => snapshot.push_error(error.clone()),
        Action::Locale { value } => snapshot.set_locale(value.clone()),
        Action::ValueSet { value_set } => snapshot.upsert_value_set(value_set.clone()),
        Action::RemoveItems { ids } => {
            for id in ids {
                snapshot.remove_item(id);
            }
        }
        Action::Complete => snapshot.mark_complete(),
        // Navigation is resolved by the authority.
        Action::Next | Action::Previous => {}
        Action::Unknown => {
            return Err(ClientError::UnexpectedAction {
                kind: action.kind().to_string(),
            })
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formsync_protocol::{ErrorRecord, Item, ValueSet};
    use proptest::prelude::*;
    use serde_json::json;

    fn reduce(snapshot: &Snapshot, actions: Vec<Action>) -> Snapshot {
        let reduction = apply(snapshot, &actions, None);
        assert!(reduction.is_clean(), "rejected: {:?}", reduction.rejected);
        reduction.snapshot
    }

    #[test]
    fn add_answer_remove_scenario() {
        let empty = Snapshot::new();

        let s = reduce(
            &empty,
            vec![
                Action::item(Item::group("q1", ["a1"])),
                Action::item(Item::new("a1", "text")),
            ],
        );
        assert_eq!(
            s.parents_of("a1").unwrap().iter().collect::<Vec<_>>(),
            vec!["q1"]
        );

        let s = reduce(&s, vec![Action::answer("a1", json!("hello"))]);
        assert_eq!(s.item("a1").unwrap().value, Some(json!("hello")));

        let s = reduce(&s, vec![Action::remove_items(["a1"])]);
        assert!(s.item("a1").is_none());
        assert!(s.parents_of("a1").is_none());
        assert!(!s.item("q1").unwrap().items.contains(&"a1".to_string()));
        assert_eq!(s.rev(), 0);
    }

    #[test]
    fn input_snapshot_is_untouched() {
        let base = reduce(&Snapshot::new(), vec![Action::item(Item::new("a1", "text"))]);
        let copy = base.clone();

        let _ = apply(&base, &[Action::answer("a1", json!(1)), Action::Complete], Some(4));

        assert_eq!(base, copy);
    }

    #[test]
    fn reset_clears_everything_but_rev() {
        let s = reduce(
            &Snapshot::new(),
            vec![
                Action::item(Item::group("q1", ["a1"])),
                Action::value_set(ValueSet::new("yn")),
                Action::error(ErrorRecord::new("required", "a1 is required")),
                Action::locale("fr"),
                Action::Complete,
            ],
        );
        let s = apply(&s, &[], Some(12)).snapshot;

        let reset = reduce(&s, vec![Action::Reset]);

        assert_eq!(reset.item_count(), 0);
        assert!(reset.reverse_items().is_empty());
        assert_eq!(reset.value_sets().count(), 0);
        assert!(reset.errors().is_empty());
        assert_eq!(reset.locale(), None);
        assert!(!reset.is_complete());
        assert_eq!(reset.rev(), 12);
    }

    #[test]
    fn new_rev_is_stamped_before_actions() {
        let reduction = apply(
            &Snapshot::new(),
            &[Action::answer("missing", json!(1)), Action::Reset],
            Some(5),
        );
        assert_eq!(reduction.rejected.len(), 1);
        assert_eq!(reduction.snapshot.rev(), 5);
    }

    #[test]
    fn answer_on_container_is_rejected_without_mutation() {
        let s = reduce(&Snapshot::new(), vec![Action::item(Item::group("g1", ["a1"]))]);

        let reduction = apply(&s, &[Action::answer("g1", json!("x"))], None);

        assert_eq!(
            reduction.rejected,
            vec![ClientError::NotAnswerable {
                id: "g1".into(),
                kind: "group".into()
            }]
        );
        assert_eq!(reduction.snapshot, s);
    }

    #[test]
    fn answer_on_note_and_missing_item() {
        let s = reduce(&Snapshot::new(), vec![Action::item(Item::note("n1"))]);

        let reduction = apply(
            &s,
            &[Action::answer("n1", json!(1)), Action::answer("zz", json!(1))],
            None,
        );

        assert!(matches!(
            reduction.rejected[0],
            ClientError::NotAnswerable { .. }
        ));
        assert_eq!(
            reduction.rejected[1],
            ClientError::ItemNotFound { id: "zz".into() }
        );
    }

    #[test]
    fn bad_action_does_not_halt_batch() {
        let reduction = apply(
            &Snapshot::new(),
            &[
                Action::item(Item::new("a1", "text")),
                Action::Unknown,
                Action::answer("a1", json!(42)),
            ],
            None,
        );

        assert_eq!(
            reduction.rejected,
            vec![ClientError::UnexpectedAction {
                kind: "UNKNOWN".into()
            }]
        );
        assert_eq!(reduction.snapshot.item("a1").unwrap().value, Some(json!(42)));
    }

    #[test]
    fn navigation_markers_are_accepted() {
        let s = Snapshot::new();
        let reduction = apply(&s, &[Action::Next, Action::Previous], None);
        assert!(reduction.is_clean());
        assert_eq!(reduction.snapshot, s);
    }

    #[test]
    fn errors_accumulate_in_order() {
        let s = reduce(
            &Snapshot::new(),
            vec![
                Action::error(ErrorRecord::new("e1", "first")),
                Action::error(ErrorRecord::new("e2", "second")),
            ],
        );
        let codes: Vec<_> = s.errors().iter().filter_map(|e| e.code.as_deref()).collect();
        assert_eq!(codes, vec!["e1", "e2"]);
    }

    #[test]
    fn complete_survives_everything_but_reset() {
        let s = reduce(&Snapshot::new(), vec![Action::Complete]);
        let s = reduce(&s, vec![Action::item(Item::new("a1", "text")), Action::Next]);
        assert!(s.is_complete());
        let s = reduce(&s, vec![Action::Reset]);
        assert!(!s.is_complete());
    }

    #[test]
    fn remove_absent_id_is_noop() {
        let s = reduce(&Snapshot::new(), vec![Action::item(Item::group("g1", ["a1"]))]);
        let after = reduce(&s, vec![Action::remove_items(["nope"])]);
        assert_eq!(after, s);
    }

    #[test]
    fn remove_parent_and_child_in_one_batch() {
        let s = reduce(
            &Snapshot::new(),
            vec![
                Action::item(Item::questionnaire("root", ["g1"])),
                Action::item(Item::group("g1", ["a1"])),
                Action::item(Item::new("a1", "text")),
            ],
        );

        for order in [["g1", "a1"], ["a1", "g1"]] {
            let after = reduce(&s, vec![Action::remove_items(order)]);
            assert!(after.item("g1").is_none());
            assert!(after.item("a1").is_none());
            assert!(after.item("root").unwrap().items.is_empty());
            assert!(after.reverse_items().is_empty());
        }
    }

    #[test]
    fn remove_only_first_occurrence() {
        let s = reduce(
            &Snapshot::new(),
            vec![Action::item(Item::group("g1", ["a1", "a2", "a1"]))],
        );
        let after = reduce(&s, vec![Action::remove_items(["a1"])]);
        assert_eq!(
            after.item("g1").unwrap().items,
            vec!["a2".to_string(), "a1".to_string()]
        );
        assert!(after.parents_of("a1").is_none());
        assert!(!after.reverse_index_consistent());
        assert!(reverse_edges_are_real(&after));

        let relisted = reduce(&after, vec![Action::item(Item::group("g1", ["a2", "a1"]))]);
        assert!(relisted.reverse_index_consistent());
    }

    #[test]
    fn server_actions_supersede_optimistic_ones() {
        let base = reduce(
            &Snapshot::new(),
            vec![
                Action::item(Item::group("q1", ["a1"])),
                Action::item(Item::new("a1", "text")),
            ],
        );

        let optimistic = reduce(&base, vec![Action::answer("a1", json!("helo"))]);

        let server = vec![Action::item(
            Item::new("a1", "text")
                .with_value(json!("hello"))
                .with_attribute("normalized", json!(true)),
        )];
        let reconciled = apply(&optimistic, &server, Some(1)).snapshot;
        let server_only = apply(&base, &server, Some(1)).snapshot;

        assert_eq!(reconciled, server_only);
    }

    fn item_id() -> impl Strategy<Value = String> {
        (0..8u8).prop_map(|n| format!("i{n}"))
    }

    fn arb_kind() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("group"),
            Just("questionnaire"),
            Just("surveygroup"),
            Just("text"),
            Just("note"),
        ]
    }

    fn arb_item() -> impl Strategy<Value = Item> {
        (item_id(), arb_kind(), proptest::collection::btree_set(item_id(), 0..4)).prop_map(
            |(id, kind, children)| Item::new(id, kind).with_children(children),
        )
    }

    /// Like `arb_item`, but children may repeat.
    fn arb_item_with_repeats() -> impl Strategy<Value = Item> {
        (item_id(), arb_kind(), proptest::collection::vec(item_id(), 0..5)).prop_map(
            |(id, kind, children)| Item::new(id, kind).with_children(children),
        )
    }

    fn arb_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            4 => arb_item().prop_map(Action::item),
            2 => proptest::collection::vec(item_id(), 0..3).prop_map(Action::remove_items),
            1 => item_id().prop_map(|id| Action::answer(id, json!("x"))),
            1 => Just(Action::Reset),
        ]
    }

    fn arb_action_with_repeats() -> impl Strategy<Value = Action> {
        prop_oneof![
            4 => arb_item_with_repeats().prop_map(Action::item),
            2 => proptest::collection::vec(item_id(), 0..3).prop_map(Action::remove_items),
            1 => Just(Action::Reset),
        ]
    }

    fn reverse_edges_are_real(snapshot: &Snapshot) -> bool {
        let derived = snapshot.derive_reverse_items();
        snapshot.reverse_items().iter().all(|(child, parents)| {
            !parents.is_empty()
                && derived
                    .get(child)
                    .is_some_and(|real| parents.is_subset(real))
        })
    }

    proptest! {
        #[test]
        fn reverse_index_matches_containment(actions in proptest::collection::vec(arb_action(), 0..40)) {
            let reduction = apply(&Snapshot::new(), &actions, None);
            prop_assert!(reduction.snapshot.reverse_index_consistent());
        }

        #[test]
        fn repeated_children_upserts_stay_consistent(
            items in proptest::collection::vec(arb_item_with_repeats(), 0..30)
        ) {
            let actions: Vec<Action> = items.into_iter().map(Action::item).collect();
            let reduction = apply(&Snapshot::new(), &actions, None);
            prop_assert!(reduction.snapshot.reverse_index_consistent());
        }

        #[test]
        fn repeated_children_never_leave_phantom_edges(
            actions in proptest::collection::vec(arb_action_with_repeats(), 0..40)
        ) {
            let reduction = apply(&Snapshot::new(), &actions, None);
            prop_assert!(reverse_edges_are_real(&reduction.snapshot));
        }

        #[test]
        fn batch_equals_sequential(actions in proptest::collection::vec(arb_action(), 0..20)) {
            let batched = apply(&Snapshot::new(), &actions, None).snapshot;
            let mut sequential = Snapshot::new();
            for action in &actions {
                sequential = apply(&sequential, std::slice::from_ref(action), None).snapshot;
            }
            prop_assert_eq!(batched, sequential);
        }
    }
}

//! Selection state: sentinel count, XOR law and single selection.

use std::collections::BTreeSet;
use std::sync::Arc;

use horizon_grid::model::{RowSelectionMode, SelectionEventSource, SelectionState, SelectionStrategy};
use horizon_grid::{Diagnostics, WarningCode};
use proptest::prelude::*;
use serde_json::json;

fn strategy(mode: RowSelectionMode) -> (SelectionStrategy, Arc<Diagnostics>) {
    let diagnostics = Arc::new(Diagnostics::new());
    diagnostics.set_suppress_logging(true);
    (SelectionStrategy::new(mode, diagnostics.clone()), diagnostics)
}

#[test]
fn test_select_all_sentinel() {
    let (mut selection, _) = strategy(RowSelectionMode::Multiple);
    selection.set_nodes_selected(&["a", "b"], true, false, SelectionEventSource::Api);
    assert_eq!(selection.get_selection_count(), 2);

    selection.select_all_row_nodes(SelectionEventSource::SelectAll);
    assert_eq!(selection.get_selection_count(), -1);
    assert!(!selection.is_empty());

    selection.deselect_all_row_nodes(SelectionEventSource::SelectAll);
    assert_eq!(selection.get_selection_count(), 0);
    assert!(selection.is_empty());
}

#[test]
fn test_exceptions_under_select_all() {
    let (mut selection, _) = strategy(RowSelectionMode::Multiple);
    selection.select_all_row_nodes(SelectionEventSource::Api);
    let changed = selection.set_nodes_selected(&["b"], false, false, SelectionEventSource::Checkbox);
    assert_eq!(changed, 1);
    assert!(selection.is_selected("a"));
    assert!(!selection.is_selected("b"));
    assert_eq!(
        selection.get_selection_state(),
        SelectionState {
            select_all: true,
            toggled_nodes: BTreeSet::from(["b".to_string()]),
        }
    );
}

#[test]
fn test_single_mode_rejects_two_nodes() {
    let (mut selection, diagnostics) = strategy(RowSelectionMode::Single);
    selection.set_nodes_selected(&["n0"], true, false, SelectionEventSource::Api);
    let before = selection.get_selection_state();

    let changed = selection.set_nodes_selected(&["n1", "n2"], true, false, SelectionEventSource::Api);
    assert_eq!(changed, 0);
    assert_eq!(selection.get_selection_state(), before);
    assert_eq!(diagnostics.count(WarningCode::SingleSelectionViolation), 1);
}

#[test]
fn test_invalid_state_is_rejected() {
    let (mut selection, diagnostics) = strategy(RowSelectionMode::Multiple);
    selection.set_nodes_selected(&["a"], true, false, SelectionEventSource::Api);
    let before = selection.get_selection_state();

    assert!(selection.set_selection_state_json(&json!({ "selectAll": "yes", "toggledNodes": [] })).is_err());
    assert!(selection.set_selection_state_json(&json!({ "selectAll": true, "toggledNodes": "a" })).is_err());
    assert_eq!(selection.get_selection_state(), before);
    assert_eq!(diagnostics.count(WarningCode::InvalidSelectionState), 2);

    selection
        .set_selection_state_json(&json!({ "selectAll": true, "toggledNodes": ["x", 7] }))
        .unwrap();
    assert!(!selection.is_selected("7"));
    assert!(selection.is_selected("a"));
}

// ── Property tests ──────────────────────────────────────────────────────

const IDS: [&str; 5] = ["a", "b", "c", "d", "e"];

#[derive(Debug, Clone)]
enum Op {
    Set(Vec<usize>, bool, bool),
    SelectAll,
    DeselectAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (prop::collection::vec(0..IDS.len(), 1..4), any::<bool>(), any::<bool>())
            .prop_map(|(ids, value, clear)| Op::Set(ids, value, clear)),
        1 => Just(Op::SelectAll),
        1 => Just(Op::DeselectAll),
    ]
}

proptest! {
    #[test]
    fn selection_follows_xor_law(ops in prop::collection::vec(op_strategy(), 1..20)) {
        let (mut selection, _) = strategy(RowSelectionMode::Multiple);
        let mut expected: BTreeSet<&str> = BTreeSet::new();

        for op in &ops {
            match op {
                Op::Set(ids, value, clear) => {
                    let names: Vec<&str> = ids.iter().map(|&i| IDS[i]).collect();
                    selection.set_nodes_selected(&names, *value, *clear, SelectionEventSource::Api);
                    if *clear {
                        expected.clear();
                    }
                    for name in names {
                        if *value {
                            expected.insert(name);
                        } else {
                            expected.remove(name);
                        }
                    }
                }
                Op::SelectAll => {
                    selection.select_all_row_nodes(SelectionEventSource::Api);
                    expected = IDS.into_iter().collect();
                }
                Op::DeselectAll => {
                    selection.deselect_all_row_nodes(SelectionEventSource::Api);
                    expected.clear();
                }
            }

            let state = selection.get_selection_state();
            for id in IDS {
                let selected = selection.is_selected(id);
                prop_assert_eq!(selected, state.select_all != state.toggled_nodes.contains(id));
                prop_assert_eq!(selected, expected.contains(id), "ops: {:?}", ops);
            }
            prop_assert_eq!(selection.is_empty(), selection.get_selection_count() == 0);
        }
    }
}

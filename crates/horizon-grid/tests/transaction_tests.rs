//! Incremental transactions against full rebuilds.

use std::sync::Arc;

use horizon_grid::model::{MissingParentPolicy, Record, RowAccessors, RowTransaction, RowTree, RowValue};
use horizon_grid::{Diagnostics, WarningCode};
use proptest::prelude::*;

fn row(id: &str, parent: Option<&str>) -> Record {
    let record = Record::new().with("id", id);
    match parent {
        Some(parent) => record.with("parentId", parent),
        None => record,
    }
}

fn tree(policy: MissingParentPolicy) -> (RowTree<Record>, Arc<Diagnostics>) {
    let diagnostics = Arc::new(Diagnostics::new());
    diagnostics.set_suppress_logging(true);
    let tree = RowTree::new(
        RowAccessors::for_records("id", Some("parentId")),
        policy,
        diagnostics.clone(),
    );
    (tree, diagnostics)
}

fn rebuilt(policy: MissingParentPolicy, rows: Vec<Record>) -> String {
    let (mut tree, _) = tree(policy);
    tree.set_row_data(rows);
    tree.snapshot().to_compact_string()
}

fn shape(tree: &RowTree<Record>) -> String {
    tree.snapshot().to_compact_string()
}

#[test]
fn test_remove_all_then_re_add() {
    let (mut tree, diagnostics) = tree(MissingParentPolicy::Root);
    tree.set_row_data(vec![row("A", None), row("B", Some("A")), row("C", Some("B"))]);

    tree.apply_transaction(RowTransaction::new().with_remove_ids(["B", "C"]));
    assert_eq!(shape(&tree), "A");
    tree.apply_transaction(RowTransaction::new().with_remove_ids(["A"]));
    assert!(tree.is_empty());

    let final_rows = vec![row("C", Some("B")), row("A", None), row("B", Some("A"))];
    let result = tree.apply_transaction(RowTransaction::new().with_add(final_rows.clone()));
    assert_eq!(result.add, vec!["C", "A", "B"]);
    assert_eq!(shape(&tree), rebuilt(MissingParentPolicy::Root, final_rows));
    assert_eq!(shape(&tree), "A(B(C))");
    assert_eq!(diagnostics.count(WarningCode::MissingParent), 0);
}

#[test]
fn test_re_add_siblings_in_add_order() {
    let (mut tree, _) = tree(MissingParentPolicy::Root);
    tree.set_row_data(vec![row("A", None), row("B", Some("A")), row("C", Some("A"))]);
    tree.apply_transaction(RowTransaction::new().with_remove_ids(["B", "C"]));
    tree.apply_transaction(RowTransaction::new().with_remove_ids(["A"]));

    let final_rows = vec![row("C", Some("A")), row("A", None), row("B", Some("A"))];
    tree.apply_transaction(RowTransaction::new().with_add(final_rows.clone()));
    assert_eq!(shape(&tree), "A(C, B)");
    assert_eq!(shape(&tree), rebuilt(MissingParentPolicy::Root, final_rows));
}

#[test]
fn test_remove_parent_with_children() {
    let (mut tree, diagnostics) = tree(MissingParentPolicy::Root);
    tree.set_row_data(vec![row("A", None), row("B", Some("A")), row("C", Some("A"))]);

    let result = tree.apply_transaction(RowTransaction::new().with_remove_ids(["A"]));
    assert_eq!(result.remove, vec!["A"]);
    assert_eq!(shape(&tree), "B, C");

    let orphaned = diagnostics.warnings_with_code(WarningCode::OrphanedChildren);
    assert_eq!(orphaned.len(), 1);
    assert_eq!(orphaned[0].context_value("orphans"), Some("B,C"));
    assert_eq!(diagnostics.count(WarningCode::MissingParent), 0);
}

#[test]
fn test_remove_parent_with_children_filler_policy() {
    let (mut tree, _) = tree(MissingParentPolicy::Filler);
    tree.set_row_data(vec![row("A", None), row("B", Some("A"))]);
    tree.apply_transaction(RowTransaction::new().with_remove_ids(["A"]));
    assert!(tree.node("A").unwrap().is_filler());
    assert_eq!(shape(&tree), "A(B)");

    tree.apply_transaction(RowTransaction::new().with_remove_ids(["B"]));
    assert!(tree.is_empty());
}

#[test]
fn test_add_and_remove_order_in_one_batch() {
    let (mut a, _) = tree(MissingParentPolicy::Root);
    let (mut b, _) = tree(MissingParentPolicy::Root);
    let initial = vec![row("A", None), row("B", Some("A"))];
    a.set_row_data(initial.clone());
    b.set_row_data(initial);

    a.apply_transaction(
        RowTransaction::new()
            .with_add([row("C", Some("A"))])
            .with_remove_ids(["B"]),
    );
    b.apply_transaction(RowTransaction::new().with_remove_ids(["B"]));
    b.apply_transaction(RowTransaction::new().with_add([row("C", Some("A"))]));

    assert_eq!(shape(&a), shape(&b));
    assert_eq!(shape(&a), "A(C)");
}

// ── Property tests ──────────────────────────────────────────────────────

const IDS: [&str; 6] = ["r0", "r1", "r2", "r3", "r4", "r5"];

/// Parent field of a generated row: absent, explicit null, or an id.
type Parent = Option<Option<usize>>;

#[derive(Debug, Clone)]
enum Op {
    Add(Vec<(usize, Parent)>),
    Update(Vec<(usize, Parent)>),
    Remove(Vec<usize>),
}

fn record(id: usize, parent: Parent) -> Record {
    let record = Record::new().with("id", IDS[id]);
    match parent {
        None => record,
        Some(None) => record.with("parentId", RowValue::Null),
        Some(Some(p)) => record.with("parentId", IDS[p]),
    }
}

fn parent_strategy() -> impl Strategy<Value = Parent> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some(None)),
        3 => (0..IDS.len()).prop_map(|p| Some(Some(p))),
    ]
}

fn rows_strategy() -> impl Strategy<Value = Vec<(usize, Parent)>> {
    prop::collection::vec((0..IDS.len(), parent_strategy()), 1..4)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => rows_strategy().prop_map(Op::Add),
        1 => rows_strategy().prop_map(Op::Update),
        1 => prop::collection::vec(0..IDS.len(), 1..3).prop_map(Op::Remove),
    ]
}

fn policy_strategy() -> impl Strategy<Value = MissingParentPolicy> {
    prop_oneof![Just(MissingParentPolicy::Root), Just(MissingParentPolicy::Filler)]
}

/// Replaces a known record in place. A row without a parent field keeps
/// the parent of the record it replaces.
fn replace(slot: &mut Record, id: usize, parent: Parent) {
    let mut next = record(id, parent);
    if parent.is_none() {
        if let Some(previous) = slot.get("parentId") {
            next.set("parentId", previous.clone());
        }
    }
    *slot = next;
}

/// Net record set in row order: new ids append, known ids are replaced in
/// place.
fn reduce(model: &mut Vec<Record>, op: &Op) {
    let position = |model: &Vec<Record>, id: &str| model.iter().position(|r| r.value("id").as_str() == Some(id));
    match op {
        Op::Add(rows) => {
            for &(id, parent) in rows {
                match position(model, IDS[id]) {
                    Some(index) => replace(&mut model[index], id, parent),
                    None => model.push(record(id, parent)),
                }
            }
        }
        Op::Update(rows) => {
            for &(id, parent) in rows {
                if let Some(index) = position(model, IDS[id]) {
                    replace(&mut model[index], id, parent);
                }
            }
        }
        Op::Remove(ids) => model.retain(|r| !ids.iter().any(|&id| r.value("id").as_str() == Some(IDS[id]))),
    }
}

fn transaction(op: &Op) -> RowTransaction<Record> {
    match op {
        Op::Add(rows) => RowTransaction::new().with_add(rows.iter().map(|&(id, parent)| record(id, parent))),
        Op::Update(rows) => RowTransaction::new().with_update(rows.iter().map(|&(id, parent)| record(id, parent))),
        Op::Remove(ids) => RowTransaction::new().with_remove_ids(ids.iter().map(|&id| IDS[id])),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn incremental_matches_rebuild(
        policy in policy_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..12),
    ) {
        let (mut tree, _) = tree(policy);
        let mut model = Vec::new();
        for op in &ops {
            tree.apply_transaction(transaction(op));
            reduce(&mut model, op);
        }
        prop_assert_eq!(shape(&tree), rebuilt(policy, model), "policy: {:?}, ops: {:?}", policy, ops);
    }

    #[test]
    fn no_row_is_its_own_ancestor(
        policy in policy_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..12),
    ) {
        let (mut tree, _) = tree(policy);
        for op in &ops {
            tree.apply_transaction(transaction(op));
            for id in IDS {
                prop_assert!(!tree.is_ancestor(id, id));
            }
            let mut seen = 0;
            tree.for_each_node(|_| seen += 1);
            prop_assert_eq!(seen, tree.len());
        }
    }
}

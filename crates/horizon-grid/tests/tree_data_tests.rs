//! Tree building from flat rows linked by parent id.

use std::sync::Arc;

use horizon_grid::model::{MissingParentPolicy, NodeStatus, Record, RowAccessors, RowTree};
use horizon_grid::{Diagnostics, WarningCode};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn row(id: &str, parent: Option<&str>) -> Record {
    let record = Record::new().with("id", id);
    match parent {
        Some(parent) => record.with("parentId", parent),
        None => record,
    }
}

fn build(rows: Vec<Record>, policy: MissingParentPolicy) -> (RowTree<Record>, Arc<Diagnostics>) {
    init_tracing();
    let diagnostics = Arc::new(Diagnostics::new());
    let mut tree = RowTree::new(
        RowAccessors::for_records("id", Some("parentId")),
        policy,
        diagnostics.clone(),
    );
    tree.set_row_data(rows);
    (tree, diagnostics)
}

fn shape(tree: &RowTree<Record>) -> String {
    tree.snapshot().to_compact_string()
}

#[test]
fn test_chain_builds_without_warnings() {
    let (tree, diagnostics) = build(
        vec![row("A", None), row("B", Some("A")), row("C", Some("B"))],
        MissingParentPolicy::Root,
    );
    assert_eq!(shape(&tree), "A(B(C))");
    assert!(diagnostics.is_empty());

    let c = tree.node("C").unwrap();
    assert_eq!(c.level(), 2);
    assert_eq!(c.parent().map(|p| p.id().into_owned()).as_deref(), Some("B"));
    assert!(tree.is_ancestor("A", "C"));
    assert!(!tree.is_ancestor("C", "A"));
}

fn chain(len: usize) -> Vec<Record> {
    (0..len)
        .map(|i| {
            let id = format!("n{i}");
            match i.checked_sub(1) {
                Some(parent) => row(&id, Some(&format!("n{parent}"))),
                None => row(&id, None),
            }
        })
        .collect()
}

#[test]
fn test_long_chain_in_either_order() {
    const LEN: usize = 50_000;
    let last = format!("n{}", LEN - 1);

    let (forward, diagnostics) = build(chain(LEN), MissingParentPolicy::Root);
    assert!(diagnostics.is_empty());
    assert_eq!(forward.node(&last).map(|node| node.level()), Some(LEN - 1));

    let mut rows = chain(LEN);
    rows.reverse();
    let (reversed, diagnostics) = build(rows, MissingParentPolicy::Root);
    assert!(diagnostics.is_empty());
    assert_eq!(reversed.node(&last).map(|node| node.level()), Some(LEN - 1));
    assert_eq!(reversed.root_nodes().len(), 1);

    let text = shape(&reversed);
    assert!(text.starts_with("n0(n1(n2("));
    assert!(text.ends_with(&format!("{last}{}", ")".repeat(LEN - 1))));
    assert_eq!(text, shape(&forward));
}

#[test]
fn test_deep_chain_display_lines() {
    let (tree, _) = build(chain(300), MissingParentPolicy::Root);
    let lines = tree.display_lines();
    assert_eq!(lines.len(), 300);
    assert!(lines[299].ends_with(" n299"));
    assert!(lines[0].ends_with("n0"));
}

#[test]
fn test_children_listed_before_parent() {
    let (tree, diagnostics) = build(
        vec![row("C", Some("B")), row("B", Some("A")), row("A", None)],
        MissingParentPolicy::Root,
    );
    assert_eq!(shape(&tree), "A(B(C))");
    assert!(diagnostics.is_empty());
}

#[test]
fn test_self_parent_becomes_root_leaf() {
    let (tree, diagnostics) = build(vec![row("X", Some("X"))], MissingParentPolicy::Root);
    assert_eq!(shape(&tree), "X");
    assert_eq!(tree.node("X").unwrap().status(), NodeStatus::CycleBroken);

    let warnings = diagnostics.warnings_with_code(WarningCode::CycleDetected);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].context_value("rowId"), Some("X"));
    assert_eq!(warnings[0].context_value("parentId"), Some("X"));
}

#[test]
fn test_three_cycle_breaks_last_row() {
    let (tree, diagnostics) = build(
        vec![row("A", Some("C")), row("B", Some("A")), row("C", Some("B"))],
        MissingParentPolicy::Root,
    );
    assert_eq!(shape(&tree), "C(A(B))");
    assert_eq!(diagnostics.count(WarningCode::CycleDetected), 1);
    assert_eq!(
        diagnostics.warnings_with_code(WarningCode::CycleDetected)[0].context_value("rowId"),
        Some("C")
    );
    for id in ["A", "B", "C"] {
        assert!(!tree.is_ancestor(id, id));
    }
}

#[test]
fn test_missing_parent_goes_to_root() {
    let (tree, diagnostics) = build(
        vec![row("A", None), row("B", Some("nowhere"))],
        MissingParentPolicy::Root,
    );
    assert_eq!(shape(&tree), "A, B");
    assert_eq!(tree.node("B").unwrap().status(), NodeStatus::MissingParent);

    let warnings = diagnostics.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, WarningCode::MissingParent);
    assert_eq!(warnings[0].context_value("rowId"), Some("B"));
    assert_eq!(warnings[0].context_value("parentId"), Some("nowhere"));
}

#[test]
fn test_missing_parent_filler() {
    let (tree, diagnostics) = build(
        vec![row("top", None), row("A", Some("ghost")), row("B", Some("ghost"))],
        MissingParentPolicy::Filler,
    );
    assert_eq!(shape(&tree), "top, ghost(A, B)");
    assert!(diagnostics.is_empty());

    let ghost = tree.node("ghost").unwrap();
    assert!(ghost.is_filler());
    assert!(ghost.data().is_none());
    assert_eq!(ghost.source_index(), None);
    assert_eq!(tree.row_count(), 3);
    assert_eq!(tree.len(), 4);
}

#[test]
fn test_duplicate_id_keeps_last_data() {
    let (tree, diagnostics) = build(
        vec![row("A", None).with("v", 1), row("B", None), row("A", None).with("v", 2)],
        MissingParentPolicy::Root,
    );
    assert_eq!(shape(&tree), "A, B");
    assert_eq!(diagnostics.count(WarningCode::DuplicateRowId), 1);
    let a = tree.node("A").unwrap().data().unwrap();
    assert_eq!(a.value("v").as_f64(), Some(2.0));
}

#[test]
fn test_display_lines_mark_status() {
    let (tree, _) = build(
        vec![row("A", None), row("B", Some("A")), row("X", Some("X")), row("O", Some("gone"))],
        MissingParentPolicy::Root,
    );
    let lines = tree.display_lines().join("\n");
    assert!(lines.contains("X (cycle broken)"));
    assert!(lines.contains("O (missing parent)"));
}

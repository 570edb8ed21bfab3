//! Parent-id tree.
//!
//! `RowTree` turns flat rows linked by id / parent id into a forest of
//! nodes and keeps that forest up to date as transactions arrive.
//!
//! # Placement rules
//!
//! - Every real row has a `source_index`: its position in row order. A full
//!   build numbers rows in input order, later adds append, updates keep their
//!   index. Siblings are always ordered by `source_index`.
//! - A row whose parent id is absent is a root row.
//! - A row whose parent id names no row is either shown at root level with a
//!   [`MissingParent`](horizon_grid_core::WarningCode::MissingParent) warning
//!   or attached under a filler placeholder, depending on the
//!   [`MissingParentPolicy`].
//! - In every cycle of parent links, the member that comes last in row order
//!   is shown at root level with a
//!   [`CycleDetected`](horizon_grid_core::WarningCode::CycleDetected) warning.
//!
//! Together these make the forest a pure function of the current records and
//! their row order, so incremental transactions and a full rebuild agree.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_grid::model::{MissingParentPolicy, Record, RowAccessors, RowTree};
//! use horizon_grid_core::Diagnostics;
//!
//! let diagnostics = Arc::new(Diagnostics::new());
//! let mut tree = RowTree::new(
//!     RowAccessors::for_records("id", Some("parentId")),
//!     MissingParentPolicy::Root,
//!     diagnostics.clone(),
//! );
//! tree.set_row_data(vec![
//!     Record::new().with("id", "A"),
//!     Record::new().with("id", "B").with("parentId", "A"),
//!     Record::new().with("id", "C").with("parentId", "B"),
//! ]);
//!
//! let c = tree.node("C").unwrap();
//! assert_eq!(c.level(), 2);
//! assert!(tree.is_ancestor("A", "C"));
//! assert!(diagnostics.is_empty());
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use horizon_grid_core::logging::{DebugTree, TreeFormatter};
use horizon_grid_core::{Diagnostics, GridWarning};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use super::node::RowNode;
use super::record::RowAccessors;
use super::transaction::Batch;

new_key_type! {
    /// Handle of a node inside one [`RowTree`].
    pub struct NodeKey;
}

/// What to do with a row whose declared parent does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingParentPolicy {
    /// Show the row at root level and report a `MissingParent` warning.
    #[default]
    Root,
    /// Create a filler node with the missing id at root level and attach the
    /// row beneath it.
    Filler,
}

/// How a node was placed during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// No declared parent. Fillers are always `Root`.
    Root,
    /// Attached under its declared parent (real or filler).
    Attached,
    /// Declared parent not found; shown at root level.
    MissingParent,
    /// Declared parent link broken to keep the forest acyclic.
    CycleBroken,
}

pub(super) struct TreeNode<R> {
    pub(super) id: String,
    /// `None` for fillers.
    pub(super) data: Option<R>,
    pub(super) declared_parent: Option<String>,
    pub(super) parent: Option<NodeKey>,
    /// Ordered by [`RowTree::position`].
    pub(super) children: Vec<NodeKey>,
    pub(super) source_index: u64,
    pub(super) status: NodeStatus,
    /// In the root list or in its parent's child list.
    pub(super) linked: bool,
}

impl<R> TreeNode<R> {
    pub(super) fn row(id: String, data: R, declared_parent: Option<String>, source_index: u64) -> Self {
        Self {
            id,
            data: Some(data),
            declared_parent,
            parent: None,
            children: Vec::new(),
            source_index,
            status: NodeStatus::Root,
            linked: false,
        }
    }

    fn filler(id: String) -> Self {
        Self {
            id,
            data: None,
            declared_parent: None,
            parent: None,
            children: Vec::new(),
            source_index: 0,
            status: NodeStatus::Root,
            linked: false,
        }
    }

    pub(super) fn is_filler(&self) -> bool {
        self.data.is_none()
    }
}

/// Structural snapshot of one node, used to compare forests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotNode {
    /// Node id.
    pub id: String,
    /// `true` for filler placeholders.
    pub filler: bool,
    /// Placement status.
    pub status: NodeStatus,
    /// Children in display order.
    pub children: Vec<SnapshotNode>,
}

/// Structural snapshot of a whole forest.
///
/// Two trees with equal snapshots have the same ids, parent/child links,
/// sibling order, fillers and placement status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeSnapshot {
    /// Root-level nodes in display order.
    pub roots: Vec<SnapshotNode>,
}

impl TreeSnapshot {
    /// Renders the snapshot as nested `id(child, ...)` text.
    pub fn to_compact_string(&self) -> String {
        enum Step<'a> {
            Node(&'a SnapshotNode),
            Text(&'static str),
        }

        fn push_siblings<'a>(stack: &mut Vec<Step<'a>>, nodes: &'a [SnapshotNode]) {
            for (i, node) in nodes.iter().enumerate().rev() {
                stack.push(Step::Node(node));
                if i > 0 {
                    stack.push(Step::Text(", "));
                }
            }
        }

        let mut out = String::new();
        let mut stack: Vec<Step<'_>> = Vec::new();
        push_siblings(&mut stack, &self.roots);
        while let Some(step) = stack.pop() {
            match step {
                Step::Text(text) => out.push_str(text),
                Step::Node(node) => {
                    out.push_str(&node.id);
                    if !node.children.is_empty() {
                        stack.push(Step::Text(")"));
                        push_siblings(&mut stack, &node.children);
                        stack.push(Step::Text("("));
                    }
                }
            }
        }
        out
    }
}

impl Drop for SnapshotNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// A forest of rows built from id / parent-id links.
pub struct RowTree<R> {
    pub(super) accessors: RowAccessors<R>,
    pub(super) policy: MissingParentPolicy,
    pub(super) diagnostics: Arc<Diagnostics>,
    pub(super) nodes: SlotMap<NodeKey, TreeNode<R>>,
    pub(super) by_id: HashMap<String, NodeKey>,
    pub(super) roots: Vec<NodeKey>,
    /// Real rows keyed by the parent id they declare.
    pub(super) declared_children: HashMap<String, HashSet<NodeKey>>,
    /// Rows currently placed with `NodeStatus::CycleBroken`.
    pub(super) broken: HashSet<NodeKey>,
    pub(super) fillers: HashSet<NodeKey>,
    pub(super) next_index: u64,
    /// Set when a filler changed and root order must be recomputed.
    pub(super) roots_unsorted: bool,
}

impl<R> RowTree<R> {
    /// Creates an empty tree.
    pub fn new(
        accessors: RowAccessors<R>,
        policy: MissingParentPolicy,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            accessors,
            policy,
            diagnostics,
            nodes: SlotMap::with_key(),
            by_id: HashMap::new(),
            roots: Vec::new(),
            declared_children: HashMap::new(),
            broken: HashSet::new(),
            fillers: HashSet::new(),
            next_index: 0,
            roots_unsorted: false,
        }
    }

    /// The accessors rows are read through.
    pub fn accessors(&self) -> &RowAccessors<R> {
        &self.accessors
    }

    /// The active missing-parent policy.
    pub fn missing_parent_policy(&self) -> MissingParentPolicy {
        self.policy
    }

    /// The diagnostics registry warnings are reported to.
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Total number of nodes, fillers included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of real rows (fillers excluded).
    pub fn row_count(&self) -> usize {
        self.nodes.len() - self.fillers.len()
    }

    /// Returns `true` if a node (real or filler) has this id.
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &str) -> Option<RowNode<'_, R>> {
        self.by_id.get(id).map(|&key| RowNode::new(self, key))
    }

    /// Looks up a node by key.
    pub fn node_by_key(&self, key: NodeKey) -> Option<RowNode<'_, R>> {
        self.nodes.contains_key(key).then(|| RowNode::new(self, key))
    }

    /// Root-level nodes in display order.
    pub fn root_nodes(&self) -> Vec<RowNode<'_, R>> {
        self.roots.iter().map(|&key| RowNode::new(self, key)).collect()
    }

    /// Visits every node depth first, parents before children.
    pub fn for_each_node<'a, F>(&'a self, mut f: F)
    where
        F: FnMut(RowNode<'a, R>),
    {
        let mut stack: Vec<NodeKey> = self.roots.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            if let Some(node) = self.nodes.get(key) {
                f(RowNode::new(self, key));
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    /// Ancestors of a node, nearest first. Empty for unknown ids.
    pub fn ancestors(&self, id: &str) -> Vec<RowNode<'_, R>> {
        let mut result = Vec::new();
        let mut current = self
            .by_id
            .get(id)
            .and_then(|&key| self.nodes.get(key))
            .and_then(|node| node.parent);
        while let Some(key) = current {
            result.push(RowNode::new(self, key));
            if result.len() > self.nodes.len() {
                break;
            }
            current = self.nodes.get(key).and_then(|node| node.parent);
        }
        result
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `descendant`.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        self.ancestors(descendant)
            .iter()
            .any(|node| node.id() == ancestor)
    }

    /// Records of all real rows in row order.
    pub fn row_data(&self) -> Vec<&R> {
        let mut rows: Vec<(u64, &R)> = self
            .nodes
            .values()
            .filter_map(|node| node.data.as_ref().map(|data| (node.source_index, data)))
            .collect();
        rows.sort_by_key(|(index, _)| *index);
        rows.into_iter().map(|(_, data)| data).collect()
    }

    /// Structural snapshot of the forest.
    ///
    /// Built bottom-up with an explicit stack, so depth is not limited by
    /// the call stack.
    pub fn snapshot(&self) -> TreeSnapshot {
        enum Step {
            Enter(NodeKey),
            Exit(NodeKey),
        }

        let mut done: Vec<SnapshotNode> = Vec::new();
        let mut stack: Vec<Step> = self.roots.iter().rev().map(|&key| Step::Enter(key)).collect();
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(key) => {
                    stack.push(Step::Exit(key));
                    if let Some(node) = self.nodes.get(key) {
                        stack.extend(node.children.iter().rev().map(|&child| Step::Enter(child)));
                    }
                }
                Step::Exit(key) => {
                    let Some(node) = self.nodes.get(key) else {
                        continue;
                    };
                    let children = done.split_off(done.len().saturating_sub(node.children.len()));
                    done.push(SnapshotNode {
                        id: node.id.clone(),
                        filler: node.is_filler(),
                        status: node.status,
                        children,
                    });
                }
            }
        }
        TreeSnapshot { roots: done }
    }

    /// One line per node, indented by level, for debugging.
    pub fn display_lines(&self) -> Vec<String> {
        TreeFormatter::new()
            .format(self)
            .lines()
            .map(str::to_string)
            .collect()
    }

    // =========================================================================
    // Full rebuild
    // =========================================================================

    /// Replaces all rows and rebuilds the forest from scratch.
    ///
    /// Rows are numbered in input order. A repeated id keeps the position of
    /// its first occurrence and the data of its last, with a `DuplicateRowId`
    /// warning.
    pub fn set_row_data(&mut self, rows: Vec<R>) {
        let _perf = horizon_grid_core::PerfSpan::new(horizon_grid_core::logging::span_names::TREE_BUILD);
        let _span = tracing::debug_span!(target: "horizon_grid::tree", "tree_build", rows = rows.len()).entered();

        self.clear();
        let mut batch = Batch::default();
        for row in rows {
            self.add_row(row, &mut batch);
        }
        self.settle(batch);

        tracing::debug!(
            target: "horizon_grid::tree",
            nodes = self.nodes.len(),
            roots = self.roots.len(),
            "tree rebuilt"
        );
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.by_id.clear();
        self.roots.clear();
        self.declared_children.clear();
        self.broken.clear();
        self.fillers.clear();
        self.next_index = 0;
        self.roots_unsorted = false;
    }

    // =========================================================================
    // Linking
    // =========================================================================

    /// Sort key among siblings: the row's own index, or for a filler the
    /// smallest index among its children.
    pub(super) fn position(&self, key: NodeKey) -> u64 {
        match self.nodes.get(key) {
            Some(node) if node.is_filler() => node
                .children
                .first()
                .and_then(|&child| self.nodes.get(child))
                .map_or(u64::MAX, |child| child.source_index),
            Some(node) => node.source_index,
            None => u64::MAX,
        }
    }

    fn siblings(&self, parent: Option<NodeKey>) -> &[NodeKey] {
        match parent.and_then(|p| self.nodes.get(p)) {
            Some(node) => &node.children,
            None => &self.roots,
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeKey>) -> &mut Vec<NodeKey> {
        match parent {
            Some(p) if self.nodes.contains_key(p) => &mut self.nodes[p].children,
            _ => &mut self.roots,
        }
    }

    fn touches_filler(&self, parent: Option<NodeKey>) -> bool {
        parent.is_some_and(|p| self.fillers.contains(&p))
    }

    /// Inserts `key` into the sibling list of `parent` at its sorted position.
    pub(super) fn link(&mut self, key: NodeKey, parent: Option<NodeKey>) {
        let position = self.position(key);
        let index = self
            .siblings(parent)
            .partition_point(|&sibling| self.position(sibling) < position);
        self.siblings_mut(parent).insert(index, key);
        if self.touches_filler(parent) {
            self.roots_unsorted = true;
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.parent = parent;
            node.linked = true;
        }
    }

    /// Removes `key` from its sibling list. The node keeps its children.
    pub(super) fn unlink(&mut self, key: NodeKey) {
        let Some((parent, linked)) = self.nodes.get(key).map(|n| (n.parent, n.linked)) else {
            return;
        };
        if !linked {
            return;
        }

        let position = self.position(key);
        let siblings = self.siblings(parent);
        let guess = siblings.partition_point(|&sibling| self.position(sibling) < position);
        let index = if siblings.get(guess) == Some(&key) {
            Some(guess)
        } else {
            siblings.iter().position(|&sibling| sibling == key)
        };
        if let Some(index) = index {
            self.siblings_mut(parent).remove(index);
        }
        if self.touches_filler(parent) {
            self.roots_unsorted = true;
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.parent = None;
            node.linked = false;
        }
    }

    /// Returns the filler with this id, creating it at root level if needed.
    fn ensure_filler(&mut self, id: &str) -> NodeKey {
        if let Some(&key) = self.by_id.get(id) {
            return key;
        }
        let key = self.nodes.insert(TreeNode::filler(id.to_string()));
        self.by_id.insert(id.to_string(), key);
        self.fillers.insert(key);
        self.link(key, None);
        self.roots_unsorted = true;
        tracing::trace!(target: "horizon_grid::tree", filler = id, "filler created");
        key
    }

    /// Turns a real row into a filler at root level, keeping its children.
    pub(super) fn demote_to_filler(&mut self, key: NodeKey) {
        self.unlink(key);
        if let Some(node) = self.nodes.get_mut(key) {
            node.data = None;
            node.declared_parent = None;
            node.status = NodeStatus::Root;
            node.source_index = 0;
        }
        self.broken.remove(&key);
        self.fillers.insert(key);
        self.link(key, None);
        self.roots_unsorted = true;
    }

    /// Turns a filler into a real row. The caller re-resolves it.
    pub(super) fn promote_filler(&mut self, key: NodeKey, data: R, declared_parent: Option<String>) {
        self.unlink(key);
        let source_index = self.next_index;
        self.next_index += 1;
        if let Some(node) = self.nodes.get_mut(key) {
            node.data = Some(data);
            node.declared_parent = declared_parent;
            node.source_index = source_index;
        }
        self.fillers.remove(&key);
        self.roots_unsorted = true;
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Re-resolves every dirty row of a batch, prunes empty fillers and
    /// restores root order.
    pub(super) fn settle(&mut self, batch: Batch) {
        let mut dirty: Vec<NodeKey> = batch
            .dirty
            .iter()
            .chain(self.broken.iter())
            .copied()
            .filter(|&key| self.nodes.get(key).is_some_and(|node| !node.is_filler()))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        dirty.sort_by_key(|&key| self.nodes[key].source_index);

        for &key in &dirty {
            self.unlink(key);
        }
        for &key in &dirty {
            self.resolve(key, &batch);
        }

        self.prune_fillers();
        if self.roots_unsorted {
            let mut roots = std::mem::take(&mut self.roots);
            roots.sort_by_cached_key(|&key| self.position(key));
            self.roots = roots;
            self.roots_unsorted = false;
        }
    }

    fn resolve(&mut self, key: NodeKey, batch: &Batch) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let previous = node.status;
        let id = node.id.clone();
        let declared = node.declared_parent.clone();

        let status = match declared.as_deref() {
            None => {
                self.link(key, None);
                NodeStatus::Root
            }
            Some(parent_id) => match self.by_id.get(parent_id).copied() {
                None => match self.policy {
                    MissingParentPolicy::Root => {
                        self.link(key, None);
                        NodeStatus::MissingParent
                    }
                    MissingParentPolicy::Filler => {
                        let filler = self.ensure_filler(parent_id);
                        self.link(key, Some(filler));
                        NodeStatus::Attached
                    }
                },
                Some(parent) => match self.closed_cycle(key, parent) {
                    None => {
                        self.link(key, Some(parent));
                        NodeStatus::Attached
                    }
                    Some(members) => {
                        let victim = members
                            .iter()
                            .copied()
                            .max_by_key(|&member| self.nodes[member].source_index)
                            .unwrap_or(key);
                        if victim == key {
                            self.link(key, None);
                            NodeStatus::CycleBroken
                        } else {
                            self.break_cycle_at(victim);
                            self.link(key, Some(parent));
                            NodeStatus::Attached
                        }
                    }
                },
            },
        };

        if let Some(node) = self.nodes.get_mut(key) {
            node.status = status;
        }
        if status == NodeStatus::CycleBroken {
            self.broken.insert(key);
        } else {
            self.broken.remove(&key);
        }

        let changed = batch.fresh.contains(&key) || (previous != status && !batch.quiet.contains(&key));
        if changed {
            self.report_placement(&id, declared.as_deref(), status);
        }
        tracing::trace!(target: "horizon_grid::tree", row = %id, ?status, "row resolved");
    }

    /// Detaches an already attached cycle member to root level.
    fn break_cycle_at(&mut self, victim: NodeKey) {
        self.unlink(victim);
        self.link(victim, None);
        let Some(node) = self.nodes.get_mut(victim) else {
            return;
        };
        let previous = node.status;
        node.status = NodeStatus::CycleBroken;
        let id = node.id.clone();
        let declared = node.declared_parent.clone();
        self.broken.insert(victim);
        if previous != NodeStatus::CycleBroken {
            self.report_placement(&id, declared.as_deref(), NodeStatus::CycleBroken);
        }
    }

    /// If linking `key` under `parent` would close a cycle, returns the
    /// cycle's members (including `key`).
    ///
    /// A cycle closes iff `parent` lies in the subtree still hanging from
    /// `key`. The ancestors of `parent` and that subtree are searched in
    /// lockstep, so the cost is bounded by the smaller of the two.
    fn closed_cycle(&self, key: NodeKey, parent: NodeKey) -> Option<Vec<NodeKey>> {
        let mut up = Some(parent);
        let mut down: Vec<NodeKey> = self
            .nodes
            .get(key)
            .map(|node| node.children.clone())
            .unwrap_or_default();
        let mut steps = 0;

        loop {
            let step = up?;
            if step == key {
                return Some(self.cycle_path(key, parent));
            }
            up = self.nodes.get(step).and_then(|node| node.parent);

            let below = down.pop()?;
            if below == parent {
                return Some(self.cycle_path(key, parent));
            }
            if let Some(node) = self.nodes.get(below) {
                down.extend_from_slice(&node.children);
            }

            steps += 1;
            if steps > self.nodes.len() {
                return Some(vec![key]);
            }
        }
    }

    /// Rows from `parent` up to and including `key`.
    fn cycle_path(&self, key: NodeKey, parent: NodeKey) -> Vec<NodeKey> {
        let mut members = Vec::new();
        let mut current = Some(parent);
        while let Some(step) = current {
            members.push(step);
            if step == key || members.len() > self.nodes.len() {
                break;
            }
            current = self.nodes.get(step).and_then(|node| node.parent);
        }
        members
    }

    fn report_placement(&self, id: &str, declared: Option<&str>, status: NodeStatus) {
        let parent_id = declared.unwrap_or_default();
        match status {
            NodeStatus::MissingParent => {
                self.diagnostics.report(GridWarning::missing_parent(id, parent_id));
            }
            NodeStatus::CycleBroken => {
                self.diagnostics.report(GridWarning::cycle_detected(id, parent_id));
            }
            NodeStatus::Root | NodeStatus::Attached => {}
        }
    }

    fn prune_fillers(&mut self) {
        let empty: Vec<NodeKey> = self
            .fillers
            .iter()
            .copied()
            .filter(|&key| self.nodes.get(key).is_none_or(|node| node.children.is_empty()))
            .collect();
        for key in empty {
            self.unlink(key);
            self.fillers.remove(&key);
            if let Some(node) = self.nodes.remove(key) {
                self.by_id.remove(&node.id);
                tracing::trace!(target: "horizon_grid::tree", filler = %node.id, "filler pruned");
            }
            self.roots_unsorted = true;
        }
    }
}

impl<R> DebugTree for RowTree<R> {
    type Key = NodeKey;

    fn roots(&self) -> Vec<NodeKey> {
        self.roots.clone()
    }

    fn children(&self, key: NodeKey) -> Vec<NodeKey> {
        self.nodes
            .get(key)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    fn label(&self, key: NodeKey) -> String {
        match self.nodes.get(key) {
            Some(node) if node.is_filler() => format!("{} (filler)", node.id),
            Some(node) => match node.status {
                NodeStatus::Root | NodeStatus::Attached => node.id.clone(),
                NodeStatus::MissingParent => format!("{} (missing parent)", node.id),
                NodeStatus::CycleBroken => format!("{} (cycle broken)", node.id),
            },
            None => String::from("?"),
        }
    }
}

impl<R> fmt::Debug for RowTree<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowTree")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots.len())
            .field("fillers", &self.fillers.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use horizon_grid_core::WarningCode;

    fn row(id: &str, parent: Option<&str>) -> Record {
        let record = Record::new().with("id", id);
        match parent {
            Some(parent) => record.with("parentId", parent),
            None => record,
        }
    }

    fn build(policy: MissingParentPolicy, rows: Vec<Record>) -> (RowTree<Record>, Arc<Diagnostics>) {
        let diagnostics = Arc::new(Diagnostics::new());
        diagnostics.set_suppress_logging(true);
        let mut tree = RowTree::new(
            RowAccessors::for_records("id", Some("parentId")),
            policy,
            diagnostics.clone(),
        );
        tree.set_row_data(rows);
        (tree, diagnostics)
    }

    #[test]
    fn test_chain() {
        let (tree, diagnostics) = build(
            MissingParentPolicy::Root,
            vec![row("A", None), row("B", Some("A")), row("C", Some("B"))],
        );
        assert_eq!(tree.snapshot().to_compact_string(), "A(B(C))");
        assert_eq!(tree.node("C").map(|n| n.level()), Some(2));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_children_follow_row_order() {
        let (tree, _) = build(
            MissingParentPolicy::Root,
            vec![row("c", Some("p")), row("p", None), row("a", Some("p"))],
        );
        assert_eq!(tree.snapshot().to_compact_string(), "p(c, a)");
    }

    #[test]
    fn test_self_parent_is_broken() {
        let (tree, diagnostics) = build(MissingParentPolicy::Root, vec![row("X", Some("X"))]);
        let x = tree.node("X").unwrap();
        assert!(x.parent().is_none());
        assert_eq!(x.status(), NodeStatus::CycleBroken);
        let warnings = diagnostics.warnings_with_code(WarningCode::CycleDetected);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].context_value("rowId"), Some("X"));
        assert_eq!(warnings[0].context_value("parentId"), Some("X"));
    }

    #[test]
    fn test_two_cycle_breaks_last_row() {
        let (tree, diagnostics) = build(
            MissingParentPolicy::Root,
            vec![row("A", Some("B")), row("B", Some("A"))],
        );
        assert_eq!(tree.snapshot().to_compact_string(), "B(A)");
        assert_eq!(tree.node("B").unwrap().status(), NodeStatus::CycleBroken);
        assert_eq!(diagnostics.count(WarningCode::CycleDetected), 1);
    }

    #[test]
    fn test_missing_parent_root_policy() {
        let (tree, diagnostics) = build(MissingParentPolicy::Root, vec![row("A", Some("ghost"))]);
        assert_eq!(tree.node("A").unwrap().status(), NodeStatus::MissingParent);
        assert_eq!(tree.root_nodes().len(), 1);
        assert_eq!(diagnostics.count(WarningCode::MissingParent), 1);
    }

    #[test]
    fn test_missing_parent_filler_policy() {
        let (tree, diagnostics) = build(
            MissingParentPolicy::Filler,
            vec![row("top", None), row("A", Some("ghost")), row("B", Some("ghost"))],
        );
        assert_eq!(tree.snapshot().to_compact_string(), "top, ghost(A, B)");
        let ghost = tree.node("ghost").unwrap();
        assert!(ghost.is_filler());
        assert!(ghost.data().is_none());
        assert_eq!(tree.row_count(), 3);
        assert_eq!(tree.len(), 4);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let (tree, _) = build(
            MissingParentPolicy::Root,
            vec![row("A", None), row("B", Some("A")), row("C", Some("B"))],
        );
        let ids: Vec<String> = tree.ancestors("C").iter().map(|n| n.id().to_string()).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert!(!tree.is_ancestor("C", "A"));
        assert!(tree.ancestors("nope").is_empty());
    }

    #[test]
    fn test_for_each_node_depth_first() {
        let (tree, _) = build(
            MissingParentPolicy::Root,
            vec![row("A", None), row("D", None), row("B", Some("A")), row("C", Some("B"))],
        );
        let mut seen = Vec::new();
        tree.for_each_node(|node| seen.push(node.id().to_string()));
        assert_eq!(seen, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_duplicate_ids_keep_first_position() {
        let (tree, diagnostics) = build(
            MissingParentPolicy::Root,
            vec![
                row("A", None),
                row("B", None),
                row("A", None).with("v", 2),
            ],
        );
        assert_eq!(tree.snapshot().to_compact_string(), "A, B");
        assert_eq!(tree.node("A").unwrap().data().map(|r| r.value("v")), Some(2.into()));
        assert_eq!(diagnostics.count(WarningCode::DuplicateRowId), 1);
    }

    #[test]
    fn test_row_data_in_row_order() {
        let (tree, _) = build(
            MissingParentPolicy::Root,
            vec![row("B", Some("A")), row("A", None)],
        );
        let ids: Vec<String> = tree
            .row_data()
            .into_iter()
            .map(|r| r.value("id").to_string())
            .collect();
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_display_lines() {
        let (tree, _) = build(
            MissingParentPolicy::Root,
            vec![row("A", None), row("B", Some("A")), row("X", Some("X"))],
        );
        let lines = tree.display_lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "A");
        assert!(lines[1].ends_with("B"));
        assert_eq!(lines[2], "X (cycle broken)");
    }
}

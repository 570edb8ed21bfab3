//! Incremental add / update / remove transactions.
//!
//! A transaction is applied in three phases: removals, then updates, then
//! adds. Each phase edits records and collects the rows whose placement may
//! have changed; those rows are then re-resolved in row order against the
//! final state of the batch. Rows outside that set keep their placement.
//!
//! The outcome never depends on how the changes were split into batches:
//! applying `T1..Tn` one at a time, applying their net effect as one batch,
//! and rebuilding from the final rows all produce the same forest.

use std::collections::HashSet;

use horizon_grid_core::GridWarning;
use horizon_grid_core::logging::span_names;

use super::tree::{MissingParentPolicy, NodeKey, RowTree, TreeNode};

/// A batch of row changes.
#[derive(Debug, Clone)]
pub struct RowTransaction<R> {
    /// Rows to add. A row whose id already exists is treated as an update.
    pub add: Vec<R>,
    /// Rows to update, matched by id.
    pub update: Vec<R>,
    /// Rows to remove, matched by id.
    pub remove: Vec<R>,
    /// Ids to remove, for callers that no longer hold the records.
    pub remove_ids: Vec<String>,
}

impl<R> Default for RowTransaction<R> {
    fn default() -> Self {
        Self {
            add: Vec::new(),
            update: Vec::new(),
            remove: Vec::new(),
            remove_ids: Vec::new(),
        }
    }
}

impl<R> RowTransaction<R> {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds rows.
    pub fn with_add(mut self, rows: impl IntoIterator<Item = R>) -> Self {
        self.add.extend(rows);
        self
    }

    /// Updates rows.
    pub fn with_update(mut self, rows: impl IntoIterator<Item = R>) -> Self {
        self.update.extend(rows);
        self
    }

    /// Removes rows.
    pub fn with_remove(mut self, rows: impl IntoIterator<Item = R>) -> Self {
        self.remove.extend(rows);
        self
    }

    /// Removes rows by id.
    pub fn with_remove_ids<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.remove_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Returns `true` if the transaction carries no changes.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty() && self.remove_ids.is_empty()
    }
}

/// Ids affected by an applied transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowNodeTransaction {
    /// Ids of rows created.
    pub add: Vec<String>,
    /// Ids of rows whose data was replaced (including adds of existing ids).
    pub update: Vec<String>,
    /// Ids of rows removed.
    pub remove: Vec<String>,
}

impl RowNodeTransaction {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }

    /// Folds another result into this one.
    pub fn merge(&mut self, other: RowNodeTransaction) {
        self.add.extend(other.add);
        self.update.extend(other.update);
        self.remove.extend(other.remove);
    }
}

/// Bookkeeping for one batch.
#[derive(Debug, Default)]
pub(super) struct Batch {
    /// Rows to re-resolve.
    pub(super) dirty: HashSet<NodeKey>,
    /// New rows and rows whose declared parent changed; their placement is
    /// always reported.
    pub(super) fresh: HashSet<NodeKey>,
    /// Orphans of a removal, already covered by an `OrphanedChildren` warning.
    pub(super) quiet: HashSet<NodeKey>,
    /// Ids added so far in this batch.
    added_ids: HashSet<String>,
}

impl<R> RowTree<R> {
    /// Applies one transaction and returns the affected ids.
    pub fn apply_transaction(&mut self, transaction: RowTransaction<R>) -> RowNodeTransaction {
        let _perf = horizon_grid_core::PerfSpan::new(span_names::TRANSACTION);
        let _span = tracing::debug_span!(
            target: "horizon_grid::transaction",
            "transaction",
            add = transaction.add.len(),
            update = transaction.update.len(),
            remove = transaction.remove.len() + transaction.remove_ids.len(),
        )
        .entered();

        let RowTransaction {
            add,
            update,
            remove,
            remove_ids,
        } = transaction;

        let mut result = RowNodeTransaction::default();
        let mut batch = Batch::default();

        let remove_ids: Vec<String> = remove
            .iter()
            .map(|row| self.accessors.row_id(row))
            .chain(remove_ids)
            .collect();
        for id in remove_ids {
            if self.remove_row(&id, &mut batch) {
                result.remove.push(id);
            }
        }

        let mut reported: HashSet<String> = HashSet::new();
        for row in update {
            let id = self.accessors.row_id(&row);
            if self.update_row(&id, row, &mut batch) {
                reported.insert(id.clone());
                result.update.push(id);
            } else {
                self.diagnostics.report(GridWarning::row_not_found(&id, "update"));
            }
        }

        for row in add {
            let id = self.accessors.row_id(&row);
            if self.add_row(row, &mut batch) {
                reported.insert(id.clone());
                result.add.push(id);
            } else if reported.insert(id.clone()) {
                result.update.push(id);
            }
        }

        self.settle(batch);

        tracing::debug!(
            target: "horizon_grid::transaction",
            added = result.add.len(),
            updated = result.update.len(),
            removed = result.remove.len(),
            "transaction applied"
        );
        result
    }

    /// Applies transactions one at a time in submission order.
    pub fn apply_transactions<I>(&mut self, transactions: I) -> RowNodeTransaction
    where
        I: IntoIterator<Item = RowTransaction<R>>,
    {
        let mut result = RowNodeTransaction::default();
        for transaction in transactions {
            result.merge(self.apply_transaction(transaction));
        }
        result
    }

    /// Adds a row, or updates it if the id exists. Returns `true` if a new
    /// row was created.
    pub(super) fn add_row(&mut self, row: R, batch: &mut Batch) -> bool {
        let id = self.accessors.row_id(&row);
        if !batch.added_ids.insert(id.clone()) {
            self.diagnostics.report(GridWarning::duplicate_row_id(&id));
        }

        match self.by_id.get(&id).copied() {
            Some(key) if self.nodes.get(key).is_some_and(|node| node.is_filler()) => {
                let declared = self.accessors.parent_id(&row);
                if let Some(parent) = &declared {
                    self.index_declared(parent, key);
                }
                self.promote_filler(key, row, declared);
                batch.dirty.insert(key);
                batch.fresh.insert(key);
                tracing::trace!(target: "horizon_grid::transaction", row = %id, "filler promoted");
                true
            }
            Some(_) => {
                self.update_row(&id, row, batch);
                false
            }
            None => {
                let declared = self.accessors.parent_id(&row);
                let source_index = self.next_index;
                self.next_index += 1;
                let key = self
                    .nodes
                    .insert(TreeNode::row(id.clone(), row, declared.clone(), source_index));
                self.by_id.insert(id.clone(), key);
                if let Some(parent) = &declared {
                    self.index_declared(parent, key);
                }
                batch.dirty.insert(key);
                batch.fresh.insert(key);
                if let Some(waiting) = self.declared_children.get(&id) {
                    batch.dirty.extend(waiting.iter().copied());
                }
                true
            }
        }
    }

    /// Replaces a row's data and declared parent. A row that does not
    /// declare a parent keeps the current one. Returns `false` if no real
    /// row has this id.
    fn update_row(&mut self, id: &str, row: R, batch: &mut Batch) -> bool {
        let Some(key) = self.by_id.get(id).copied() else {
            return false;
        };
        if self.nodes.get(key).is_none_or(|node| node.is_filler()) {
            return false;
        }

        let declared = if self.accessors.declares_parent(&row) {
            self.accessors.parent_id(&row)
        } else {
            self.nodes.get(key).and_then(|node| node.declared_parent.clone())
        };
        let previous = match self.nodes.get_mut(key) {
            Some(node) => {
                node.data = Some(row);
                std::mem::replace(&mut node.declared_parent, declared.clone())
            }
            None => return false,
        };

        if previous != declared {
            if let Some(old) = &previous {
                self.unindex_declared(old, key);
            }
            if let Some(new) = &declared {
                self.index_declared(new, key);
            }
            batch.dirty.insert(key);
            batch.fresh.insert(key);
            tracing::trace!(
                target: "horizon_grid::transaction",
                row = id,
                from = ?previous,
                to = ?declared,
                "row moved"
            );
        }
        true
    }

    /// Removes a row. Its children are re-resolved, never deleted.
    fn remove_row(&mut self, id: &str, batch: &mut Batch) -> bool {
        let Some(key) = self.by_id.get(id).copied() else {
            self.diagnostics.report(GridWarning::row_not_found(id, "remove"));
            return false;
        };
        let Some(node) = self.nodes.get(key) else {
            return false;
        };
        if node.is_filler() {
            self.diagnostics.report(GridWarning::row_not_found(id, "remove"));
            return false;
        }

        let children = node.children.clone();
        let declared = node.declared_parent.clone();
        if let Some(parent) = &declared {
            self.unindex_declared(parent, key);
        }
        batch.dirty.remove(&key);
        batch.fresh.remove(&key);

        if !children.is_empty() {
            let orphans: Vec<String> = children
                .iter()
                .filter_map(|&child| self.nodes.get(child).map(|n| n.id.clone()))
                .collect();
            self.diagnostics
                .report(GridWarning::orphaned_children(id, &orphans));
        }

        if self.policy == MissingParentPolicy::Filler && !children.is_empty() {
            self.demote_to_filler(key);
            return true;
        }

        self.unlink(key);
        for child in children {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = None;
                node.linked = false;
            }
            batch.dirty.insert(child);
            batch.quiet.insert(child);
        }
        self.broken.remove(&key);
        self.nodes.remove(key);
        self.by_id.remove(id);
        true
    }

    fn index_declared(&mut self, parent: &str, key: NodeKey) {
        self.declared_children
            .entry(parent.to_string())
            .or_default()
            .insert(key);
    }

    fn unindex_declared(&mut self, parent: &str, key: NodeKey) {
        if let Some(children) = self.declared_children.get_mut(parent) {
            children.remove(&key);
            if children.is_empty() {
                self.declared_children.remove(parent);
            }
        }
    }
}

//! The grid engine.
//!
//! [`GridEngine`] ties one [`RowTree`], one [`SelectionStrategy`] and a set
//! of column filters together and keeps them consistent: rows removed by a
//! transaction leave the selection, and filter changes are visible through
//! [`GridEngine::filtered_rows`] on the next call.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_grid::prelude::*;
//!
//! let mut engine = GridEngine::from_options(GridOptions::default(), Arc::new(Diagnostics::new()));
//! engine.set_row_data(vec![
//!     Record::new().with("id", "A").with("size", 10),
//!     Record::new().with("id", "B").with("parentId", "A").with("size", 900),
//! ]);
//!
//! engine.set_column_filter("size", FilterCondition::number(ConditionKind::GreaterThan, 100));
//! assert_eq!(engine.filtered_rows().displayed_ids(), vec!["A", "B"]);
//!
//! engine.set_nodes_selected(&["B"], true, false);
//! assert_eq!(engine.get_selection_count(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use horizon_grid_core::logging::targets;
use horizon_grid_core::{Diagnostics, GridWarning, Signal};
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{GridError, Result};
use crate::model::{
    FOOTER_ID_PREFIX, FilterModel, FilteredRows, Record, RowAccessors, RowNode, RowNodeTransaction,
    RowTransaction, RowTree, SelectionEventSource, SelectionState, SelectionStrategy, filter_tree,
};
use crate::options::GridOptions;

/// Data engine behind one grid.
pub struct GridEngine<R> {
    options: GridOptions,
    diagnostics: Arc<Diagnostics>,
    tree: RowTree<R>,
    selection: SelectionStrategy,
    column_filters: BTreeMap<String, FilterModel>,
    pending: Mutex<Vec<RowTransaction<R>>>,

    /// Emitted after rows were added, updated or removed.
    pub rows_changed: Signal<RowNodeTransaction>,
    /// Emitted with the affected columns after the filter model changed.
    pub filter_changed: Signal<Vec<String>>,
}

impl GridEngine<Record> {
    /// Creates an engine over [`Record`] rows keyed by the fields named in
    /// `options`.
    pub fn from_options(options: GridOptions, diagnostics: Arc<Diagnostics>) -> Self {
        let accessors = RowAccessors::for_records(&options.row_id_field, options.parent_id_field.as_deref());
        Self::new(accessors, options, diagnostics)
    }
}

impl<R> GridEngine<R> {
    /// Creates an empty engine.
    ///
    /// With `tree_data` off the parent accessor is ignored and every row is
    /// a root row.
    pub fn new(accessors: RowAccessors<R>, options: GridOptions, diagnostics: Arc<Diagnostics>) -> Self {
        let accessors = if options.tree_data {
            accessors
        } else {
            accessors.without_parent_id()
        };
        diagnostics.set_suppress_logging(options.suppress_warnings);

        Self {
            tree: RowTree::new(accessors, options.missing_parent, diagnostics.clone()),
            selection: SelectionStrategy::new(options.row_selection, diagnostics.clone()),
            column_filters: BTreeMap::new(),
            pending: Mutex::new(Vec::new()),
            options,
            diagnostics,
            rows_changed: Signal::new(),
            filter_changed: Signal::new(),
        }
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    pub fn tree(&self) -> &RowTree<R> {
        &self.tree
    }

    pub fn selection(&self) -> &SelectionStrategy {
        &self.selection
    }

    /// Node with this id. `rowGroupFooter_<id>` resolves to the footer of
    /// group `<id>` when group total rows are on.
    pub fn node(&self, id: &str) -> Option<RowNode<'_, R>> {
        resolve(&self.tree, self.options.group_total_row, id)
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Replaces every row.
    ///
    /// Selected ids that no longer exist are dropped from the selection.
    pub fn set_row_data(&mut self, rows: Vec<R>) {
        self.pending.get_mut().clear();
        self.tree.set_row_data(rows);
        self.prune_selection();

        let mut added = Vec::with_capacity(self.tree.row_count());
        self.tree.for_each_node(|node| {
            if node.data().is_some() {
                added.push(node.id().into_owned());
            }
        });
        self.rows_changed.emit(RowNodeTransaction {
            add: added,
            ..RowNodeTransaction::default()
        });
    }

    /// Applies a transaction now.
    pub fn apply_transaction(&mut self, transaction: RowTransaction<R>) -> RowNodeTransaction {
        let result = self.tree.apply_transaction(transaction);
        self.after_rows_changed(&result);
        result
    }

    /// Queues a transaction for the next [`flush_transactions`](Self::flush_transactions).
    pub fn queue_transaction(&self, transaction: RowTransaction<R>) {
        let mut pending = self.pending.lock();
        pending.push(transaction);
        tracing::trace!(target: targets::TRANSACTION, queued = pending.len(), "transaction queued");
    }

    /// Number of queued transactions.
    pub fn pending_transactions(&self) -> usize {
        self.pending.lock().len()
    }

    /// Applies queued transactions in submission order.
    pub fn flush_transactions(&mut self) -> RowNodeTransaction {
        let queued = std::mem::take(self.pending.get_mut());
        if queued.is_empty() {
            return RowNodeTransaction::default();
        }
        let result = self.tree.apply_transactions(queued);
        self.after_rows_changed(&result);
        result
    }

    fn after_rows_changed(&mut self, result: &RowNodeTransaction) {
        if result.is_empty() {
            return;
        }
        self.prune_selection();
        self.rows_changed.emit(result.clone());
    }

    /// Drops toggled ids with no node left, pruned fillers included.
    fn prune_selection(&mut self) {
        let stale: Vec<String> = self
            .selection
            .get_selection_state()
            .toggled_nodes
            .into_iter()
            .filter(|id| !self.tree.contains(id))
            .collect();
        if !stale.is_empty() {
            self.selection.remove_ids(&stale);
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Sets the selection of the rows with these ids and returns how many
    /// changed. Unknown ids are skipped with a `RowNotFound` warning.
    pub fn set_nodes_selected<S: AsRef<str>>(&mut self, ids: &[S], new_value: bool, clear_selection: bool) -> usize {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            match resolve(&self.tree, self.options.group_total_row, id) {
                Some(node) => nodes.push(node),
                None => self.diagnostics.report(GridWarning::row_not_found(id, "select")),
            }
        }
        self.selection
            .set_nodes_selected(&nodes, new_value, clear_selection, SelectionEventSource::Api)
    }

    /// Selects every row.
    pub fn select_all_row_nodes(&mut self) {
        self.selection.select_all_row_nodes(SelectionEventSource::Api);
    }

    /// Deselects every row.
    pub fn deselect_all_row_nodes(&mut self) {
        self.selection.deselect_all_row_nodes(SelectionEventSource::Api);
    }

    /// `true` if the row with this id is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.node(id)
            .is_some_and(|node| self.selection.is_node_selected(&node))
    }

    /// Selected nodes in tree order, `None` while select-all is active.
    pub fn get_selected_nodes(&self) -> Option<Vec<RowNode<'_, R>>> {
        self.selection.get_selected_nodes(&self.tree)
    }

    /// Number of selected rows, `-1` while select-all is active.
    pub fn get_selection_count(&self) -> i64 {
        self.selection.get_selection_count()
    }

    pub fn get_selection_state(&self) -> SelectionState {
        self.selection.get_selection_state()
    }

    /// Restores a serialized selection state.
    pub fn set_selection_state(&mut self, value: &Value) -> Result<()> {
        self.selection.set_selection_state_json(value)
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    /// Sets the filter of one column. Column filters are combined with AND.
    pub fn set_column_filter(&mut self, column: impl Into<String>, model: impl Into<FilterModel>) {
        let column = column.into();
        let model = model.into();
        if self.column_filters.get(&column) == Some(&model) {
            return;
        }
        tracing::debug!(target: targets::FILTER, column = %column, active = model.is_active(), "column filter set");
        self.column_filters.insert(column.clone(), model);
        self.filter_changed.emit(vec![column]);
    }

    /// Removes the filter of one column.
    pub fn clear_column_filter(&mut self, column: &str) {
        if self.column_filters.remove(column).is_some() {
            tracing::debug!(target: targets::FILTER, column, "column filter cleared");
            self.filter_changed.emit(vec![column.to_string()]);
        }
    }

    /// The filter of one column.
    pub fn column_filter(&self, column: &str) -> Option<&FilterModel> {
        self.column_filters.get(column)
    }

    /// Replaces every column filter from a `{ column: model }` JSON object.
    ///
    /// `null` or `{}` clears all filters; a `null` entry is skipped. On error
    /// the current filters are kept.
    pub fn set_filter_model(&mut self, value: &Value) -> Result<()> {
        let mut filters = BTreeMap::new();
        match value {
            Value::Object(map) => {
                for (column, model) in map {
                    if !model.is_null() {
                        filters.insert(column.clone(), FilterModel::from_json(model)?);
                    }
                }
            }
            Value::Null => {}
            _ => {
                return Err(GridError::InvalidFilterModel(serde::de::Error::custom(
                    "filter model must be an object keyed by column",
                )));
            }
        }

        if filters == self.column_filters {
            return Ok(());
        }
        let changed: Vec<String> = self
            .column_filters
            .keys()
            .chain(filters.keys())
            .filter(|column| self.column_filters.get(*column) != filters.get(*column))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        self.column_filters = filters;
        tracing::debug!(target: targets::FILTER, columns = changed.len(), "filter model replaced");
        self.filter_changed.emit(changed);
        Ok(())
    }

    /// Every column filter as a `{ column: model }` JSON object.
    pub fn get_filter_model(&self) -> Value {
        Value::Object(
            self.column_filters
                .iter()
                .map(|(column, model)| (column.clone(), model.to_json()))
                .collect(),
        )
    }

    /// `true` if any column filter has a complete condition.
    pub fn is_any_filter_present(&self) -> bool {
        self.column_filters.values().any(FilterModel::is_active)
    }

    /// `true` if the row passes every column filter on its own.
    ///
    /// Fillers and unknown ids never pass.
    pub fn does_row_pass_filter(&self, id: &str) -> bool {
        self.tree
            .node(id)
            .and_then(|node| node.data())
            .is_some_and(|row| self.row_passes(row))
    }

    fn row_passes(&self, row: &R) -> bool {
        let accessors = self.tree.accessors();
        self.column_filters
            .iter()
            .all(|(column, model)| model.passes(&accessors.value(row, column), &self.options.filter))
    }

    /// Runs the filter stage over the current tree.
    pub fn filtered_rows(&self) -> FilteredRows {
        filter_tree(&self.tree, self.options.filter_stage(), |node| {
            node.data().is_some_and(|row| self.row_passes(row))
        })
    }

    /// Visible ids in display order, with footers when group total rows
    /// are on.
    pub fn displayed_ids(&self) -> Vec<String> {
        let rows = self.filtered_rows();
        if self.options.group_total_row {
            rows.displayed_ids_with_footers()
        } else {
            rows.displayed_ids()
        }
    }
}

fn resolve<'a, R>(tree: &'a RowTree<R>, group_total_row: bool, id: &str) -> Option<RowNode<'a, R>> {
    if let Some(node) = tree.node(id) {
        return Some(node);
    }
    if !group_total_row {
        return None;
    }
    id.strip_prefix(FOOTER_ID_PREFIX)
        .and_then(|group| tree.node(group))
        .and_then(|group| group.footer())
}

impl<R> fmt::Debug for GridEngine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridEngine")
            .field("rows", &self.tree.row_count())
            .field("nodes", &self.tree.len())
            .field("selection", &self.selection)
            .field("column_filters", &self.column_filters.keys().collect::<Vec<_>>())
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

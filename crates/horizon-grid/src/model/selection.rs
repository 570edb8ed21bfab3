//! Row selection state.
//!
//! [`SelectionStrategy`] stores selection as a select-all flag plus a set of
//! exceptions: a row is selected iff `select_all XOR id ∈ toggled_nodes`.
//! "Select everything except three rows" and "select three rows" both cost
//! three entries, however many rows the grid holds.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_grid::model::{RowSelectionMode, SelectionEventSource, SelectionStrategy};
//! use horizon_grid_core::Diagnostics;
//!
//! let mut selection = SelectionStrategy::new(RowSelectionMode::Multiple, Arc::new(Diagnostics::new()));
//!
//! selection.select_all_row_nodes(SelectionEventSource::Api);
//! selection.set_nodes_selected(&["b"], false, false, SelectionEventSource::Api);
//!
//! assert!(selection.is_selected("a"));
//! assert!(!selection.is_selected("b"));
//! assert_eq!(selection.get_selection_count(), -1);
//! ```

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use horizon_grid_core::{Diagnostics, GridWarning, Signal};
use serde::{Deserialize, Serialize};

use super::node::RowNode;
use super::tree::RowTree;
use crate::error::{GridError, Result};

/// Whether more than one row can be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowSelectionMode {
    /// At most one selected row.
    Single,
    /// Any number of selected rows.
    #[default]
    Multiple,
}

/// What triggered a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionEventSource {
    /// Programmatic call.
    Api,
    /// A row was clicked.
    RowClicked,
    /// A selection checkbox was toggled.
    Checkbox,
    /// Select-all or deselect-all.
    SelectAll,
    /// A saved selection state was restored.
    SelectionState,
    /// Selected rows were removed from the data.
    RowDataChanged,
}

impl SelectionEventSource {
    /// Stable name of the source.
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionEventSource::Api => "api",
            SelectionEventSource::RowClicked => "rowClicked",
            SelectionEventSource::Checkbox => "checkboxSelected",
            SelectionEventSource::SelectAll => "selectAll",
            SelectionEventSource::SelectionState => "selectionState",
            SelectionEventSource::RowDataChanged => "rowDataChanged",
        }
    }
}

impl fmt::Display for SelectionEventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable selection state.
///
/// ```json
/// { "selectAll": true, "toggledNodes": ["7", "9"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    /// Baseline selection of every row.
    pub select_all: bool,
    /// Rows whose selection differs from the baseline.
    pub toggled_nodes: BTreeSet<String>,
}

impl SelectionState {
    /// `true` iff the row is selected under this state.
    pub fn is_selected(&self, id: &str) -> bool {
        self.select_all != self.toggled_nodes.contains(id)
    }

    /// Validates and converts a JSON value.
    ///
    /// Both `selectAll` (a boolean) and `toggledNodes` (an array of ids) are
    /// required. Ids may be strings or integers.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| GridError::invalid_selection_state("state must be an object"))?;

        let select_all = match object.get("selectAll") {
            Some(serde_json::Value::Bool(flag)) => *flag,
            Some(_) => return Err(GridError::invalid_selection_state("selectAll must be a boolean")),
            None => return Err(GridError::invalid_selection_state("selectAll is missing")),
        };

        let toggled = match object.get("toggledNodes") {
            Some(serde_json::Value::Array(items)) => items,
            Some(_) => return Err(GridError::invalid_selection_state("toggledNodes must be an array")),
            None => return Err(GridError::invalid_selection_state("toggledNodes is missing")),
        };

        let toggled_nodes = toggled
            .iter()
            .map(|item| match item {
                serde_json::Value::String(id) => Ok(id.clone()),
                serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
                other => Err(GridError::invalid_selection_state(format!(
                    "toggledNodes entries must be row ids, found {other}"
                ))),
            })
            .collect::<Result<BTreeSet<String>>>()?;

        Ok(Self {
            select_all,
            toggled_nodes,
        })
    }
}

/// Payload of [`SelectionStrategy::selection_changed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChangedEvent {
    /// What triggered the change.
    pub source: SelectionEventSource,
    /// Selection count after the change (`-1` under select-all).
    pub selection_count: i64,
}

/// Something that can be selected: a row id, or a node view.
pub trait SelectableRow {
    /// Id the selection is recorded under.
    fn selection_id(&self) -> Cow<'_, str>;
}

impl SelectableRow for str {
    fn selection_id(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl SelectableRow for String {
    fn selection_id(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl<T: SelectableRow + ?Sized> SelectableRow for &T {
    fn selection_id(&self) -> Cow<'_, str> {
        (**self).selection_id()
    }
}

/// Footers are not selectable themselves; they stand for their group.
impl<R> SelectableRow for RowNode<'_, R> {
    fn selection_id(&self) -> Cow<'_, str> {
        match self.sibling() {
            Some(group) if self.is_footer() => group.id(),
            _ => self.id(),
        }
    }
}

/// Select-all plus exceptions selection state.
pub struct SelectionStrategy {
    mode: RowSelectionMode,
    state: SelectionState,
    /// Set once select-all is used; never cleared.
    select_all_used: bool,
    diagnostics: Arc<Diagnostics>,

    /// Emitted after every change of the selection state.
    pub selection_changed: Signal<SelectionChangedEvent>,
}

impl SelectionStrategy {
    /// Creates an empty selection.
    pub fn new(mode: RowSelectionMode, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            mode,
            state: SelectionState::default(),
            select_all_used: false,
            diagnostics,
            selection_changed: Signal::new(),
        }
    }

    // =========================================================================
    // Mode
    // =========================================================================

    /// Gets the selection mode.
    pub fn mode(&self) -> RowSelectionMode {
        self.mode
    }

    /// Sets the selection mode. The current selection is kept.
    pub fn set_mode(&mut self, mode: RowSelectionMode) {
        self.mode = mode;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// `true` iff the row with this id is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.state.is_selected(id)
    }

    /// `true` iff the node is selected. Footers answer for their group.
    pub fn is_node_selected<N: SelectableRow + ?Sized>(&self, node: &N) -> bool {
        self.state.is_selected(&node.selection_id())
    }

    /// Number of selected rows, or `-1` while select-all is active.
    pub fn get_selection_count(&self) -> i64 {
        if self.state.select_all {
            -1
        } else {
            self.state.toggled_nodes.len() as i64
        }
    }

    /// `true` iff nothing is selected.
    pub fn is_empty(&self) -> bool {
        !self.state.select_all && self.state.toggled_nodes.is_empty()
    }

    /// `true` if select-all was used at any time.
    pub fn select_all_used(&self) -> bool {
        self.select_all_used
    }

    /// Selected nodes in tree order.
    ///
    /// Returns `None` while select-all is active, since the selection is not
    /// materialized. Once select-all has been used, every call also reports
    /// a `SelectAllEnumeration` warning.
    pub fn get_selected_nodes<'a, R>(&self, tree: &'a RowTree<R>) -> Option<Vec<RowNode<'a, R>>> {
        if self.select_all_used {
            self.diagnostics.report(GridWarning::select_all_enumeration());
        }
        if self.state.select_all {
            return None;
        }

        let mut selected = Vec::with_capacity(self.state.toggled_nodes.len());
        tree.for_each_node(|node| {
            if self.state.toggled_nodes.contains(&*node.id()) {
                selected.push(node);
            }
        });
        Some(selected)
    }

    /// A copy of the current state.
    pub fn get_selection_state(&self) -> SelectionState {
        self.state.clone()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Sets the selection of `nodes` to `new_value` and returns how many of
    /// them changed.
    ///
    /// With `clear_selection` every other row is deselected first. In single
    /// mode passing more than one node is rejected with a
    /// `SingleSelectionViolation` warning and returns 0; passing one node
    /// makes it the whole selection (or clears the selection when
    /// deselecting). An empty slice leaves a single-mode selection as is.
    pub fn set_nodes_selected<N: SelectableRow>(
        &mut self,
        nodes: &[N],
        new_value: bool,
        clear_selection: bool,
        source: SelectionEventSource,
    ) -> usize {
        if self.mode == RowSelectionMode::Single && nodes.len() > 1 {
            self.diagnostics
                .report(GridWarning::single_selection_violation(nodes.len()));
            return 0;
        }
        if self.mode == RowSelectionMode::Single && nodes.is_empty() {
            return 0;
        }

        let before = self.state.clone();

        if self.mode == RowSelectionMode::Single || clear_selection {
            self.state = SelectionState::default();
        }

        let mut changed = 0;
        for node in nodes {
            let id = node.selection_id();
            if new_value == self.state.select_all {
                self.state.toggled_nodes.remove(&*id);
            } else {
                self.state.toggled_nodes.insert(id.to_string());
            }
            if before.is_selected(&id) != self.state.is_selected(&id) {
                changed += 1;
            }
        }

        tracing::debug!(
            target: "horizon_grid::selection",
            nodes = nodes.len(),
            new_value,
            clear_selection,
            changed,
            source = source.as_str(),
            "set nodes selected"
        );
        self.notify_if_changed(&before, source);
        changed
    }

    /// Selects every row without enumerating them.
    pub fn select_all_row_nodes(&mut self, source: SelectionEventSource) {
        let before = std::mem::replace(
            &mut self.state,
            SelectionState {
                select_all: true,
                toggled_nodes: BTreeSet::new(),
            },
        );
        self.select_all_used = true;
        self.notify_if_changed(&before, source);
    }

    /// Deselects every row.
    pub fn deselect_all_row_nodes(&mut self, source: SelectionEventSource) {
        let before = std::mem::take(&mut self.state);
        self.notify_if_changed(&before, source);
    }

    /// Replaces the state.
    pub fn set_selection_state(&mut self, state: SelectionState, source: SelectionEventSource) {
        if state.select_all {
            self.select_all_used = true;
        }
        let before = std::mem::replace(&mut self.state, state);
        self.notify_if_changed(&before, source);
    }

    /// Replaces the state from JSON.
    ///
    /// A value failing validation is reported as an `InvalidSelectionState`
    /// warning, the current state is kept, and the error is returned.
    pub fn set_selection_state_json(&mut self, value: &serde_json::Value) -> Result<()> {
        match SelectionState::from_json(value) {
            Ok(state) => {
                self.set_selection_state(state, SelectionEventSource::SelectionState);
                Ok(())
            }
            Err(err) => {
                if let GridError::InvalidSelectionState { reason } = &err {
                    self.diagnostics
                        .report(GridWarning::invalid_selection_state(reason.as_str()));
                }
                Err(err)
            }
        }
    }

    /// Drops ids of rows that no longer exist. Returns how many were dropped.
    pub fn remove_ids<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let before = self.state.clone();
        let mut removed = 0;
        for id in ids {
            if self.state.toggled_nodes.remove(id.as_ref()) {
                removed += 1;
            }
        }
        self.notify_if_changed(&before, SelectionEventSource::RowDataChanged);
        removed
    }

    fn notify_if_changed(&self, before: &SelectionState, source: SelectionEventSource) {
        if *before == self.state {
            return;
        }
        self.selection_changed.emit(SelectionChangedEvent {
            source,
            selection_count: self.get_selection_count(),
        });
    }
}

impl fmt::Debug for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionStrategy")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("select_all_used", &self.select_all_used)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use horizon_grid_core::WarningCode;
    use serde_json::json;

    use super::*;

    fn strategy(mode: RowSelectionMode) -> (SelectionStrategy, Arc<Diagnostics>) {
        let diagnostics = Arc::new(Diagnostics::new());
        diagnostics.set_suppress_logging(true);
        (SelectionStrategy::new(mode, diagnostics.clone()), diagnostics)
    }

    #[test]
    fn test_multi_select_and_deselect() {
        let (mut selection, _) = strategy(RowSelectionMode::Multiple);
        let changed = selection.set_nodes_selected(&["a", "b"], true, false, SelectionEventSource::Api);
        assert_eq!(changed, 2);
        assert_eq!(selection.get_selection_count(), 2);

        let changed = selection.set_nodes_selected(&["a"], false, false, SelectionEventSource::Api);
        assert_eq!(changed, 1);
        assert_eq!(selection.get_selection_state().toggled_nodes, BTreeSet::from(["b".to_string()]));
    }

    #[test]
    fn test_clear_selection_first() {
        let (mut selection, _) = strategy(RowSelectionMode::Multiple);
        selection.set_nodes_selected(&["a", "b"], true, false, SelectionEventSource::Api);
        selection.set_nodes_selected(&["c"], true, true, SelectionEventSource::RowClicked);
        assert!(!selection.is_selected("a"));
        assert!(selection.is_selected("c"));
        assert_eq!(selection.get_selection_count(), 1);
    }

    #[test]
    fn test_single_mode_rejects_many() {
        let (mut selection, diagnostics) = strategy(RowSelectionMode::Single);
        selection.set_nodes_selected(&["a"], true, false, SelectionEventSource::Api);
        let before = selection.get_selection_state();

        let changed = selection.set_nodes_selected(&["b", "c"], true, false, SelectionEventSource::Api);
        assert_eq!(changed, 0);
        assert_eq!(selection.get_selection_state(), before);
        assert_eq!(diagnostics.count(WarningCode::SingleSelectionViolation), 1);
    }

    #[test]
    fn test_single_mode_replaces_selection() {
        let (mut selection, _) = strategy(RowSelectionMode::Single);
        selection.set_nodes_selected(&["a"], true, false, SelectionEventSource::Api);
        selection.set_nodes_selected(&["b"], true, false, SelectionEventSource::Api);
        assert!(!selection.is_selected("a"));
        assert!(selection.is_selected("b"));

        selection.set_nodes_selected(&["b"], false, false, SelectionEventSource::Api);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_single_mode_empty_slice_keeps_selection() {
        let (mut selection, diagnostics) = strategy(RowSelectionMode::Single);
        selection.set_nodes_selected(&["a"], true, false, SelectionEventSource::Api);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        selection.selection_changed.connect(move |_| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        let none: [&str; 0] = [];
        assert_eq!(selection.set_nodes_selected(&none, true, false, SelectionEventSource::Api), 0);
        assert_eq!(selection.set_nodes_selected(&none, false, true, SelectionEventSource::Api), 0);
        assert!(selection.is_selected("a"));
        assert_eq!(selection.get_selection_count(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(diagnostics.count(WarningCode::SingleSelectionViolation), 0);
    }

    #[test]
    fn test_select_all_sentinel() {
        let (mut selection, _) = strategy(RowSelectionMode::Multiple);
        selection.select_all_row_nodes(SelectionEventSource::SelectAll);
        assert_eq!(selection.get_selection_count(), -1);
        assert!(!selection.is_empty());

        selection.set_nodes_selected(&["x"], false, false, SelectionEventSource::Api);
        assert!(!selection.is_selected("x"));
        assert!(selection.is_selected("y"));
        assert_eq!(selection.get_selection_count(), -1);

        selection.deselect_all_row_nodes(SelectionEventSource::SelectAll);
        assert_eq!(selection.get_selection_count(), 0);
        assert!(selection.is_empty());
        assert!(selection.select_all_used());
    }

    #[test]
    fn test_selection_state_json() {
        let (mut selection, diagnostics) = strategy(RowSelectionMode::Multiple);
        selection
            .set_selection_state_json(&json!({ "selectAll": true, "toggledNodes": ["a", 7] }))
            .unwrap();
        assert!(!selection.is_selected("a"));
        assert!(!selection.is_selected("7"));
        assert!(selection.is_selected("b"));

        let err = selection
            .set_selection_state_json(&json!({ "selectAll": "yes", "toggledNodes": [] }))
            .unwrap_err();
        assert!(matches!(err, GridError::InvalidSelectionState { .. }));
        assert!(selection.get_selection_state().select_all);

        assert!(selection
            .set_selection_state_json(&json!({ "selectAll": false, "toggledNodes": "a" }))
            .is_err());
        assert!(selection.set_selection_state_json(&json!([1, 2])).is_err());
        assert_eq!(diagnostics.count(WarningCode::InvalidSelectionState), 3);
    }

    #[test]
    fn test_selection_state_serde() {
        let state = SelectionState {
            select_all: false,
            toggled_nodes: BTreeSet::from(["a".to_string()]),
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value, json!({ "selectAll": false, "toggledNodes": ["a"] }));
    }

    #[test]
    fn test_remove_ids_prunes_exceptions() {
        let (mut selection, _) = strategy(RowSelectionMode::Multiple);
        selection.set_nodes_selected(&["a", "b"], true, false, SelectionEventSource::Api);
        assert_eq!(selection.remove_ids(["a", "zzz"]), 1);
        assert_eq!(selection.get_selection_count(), 1);
    }

    #[test]
    fn test_signal_only_on_change() {
        let (mut selection, _) = strategy(RowSelectionMode::Multiple);
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        selection.selection_changed.connect(move |event| {
            assert_eq!(event.source, SelectionEventSource::Api);
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        selection.set_nodes_selected(&["a"], true, false, SelectionEventSource::Api);
        selection.set_nodes_selected(&["a"], true, false, SelectionEventSource::Api);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}

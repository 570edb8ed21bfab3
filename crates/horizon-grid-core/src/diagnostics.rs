//! Structured diagnostic channel.
//!
//! Recoverable problems found by the engine (a missing parent, a parent
//! cycle, a rejected selection state, ...) are never returned as errors.
//! They are reported as a [`GridWarning`] to a [`Diagnostics`] registry which
//! records it, logs it through `tracing`, and emits it on its
//! [`warning`](Diagnostics::warning) signal.
//!
//! A `Diagnostics` instance is an ordinary value owned by the caller and
//! shared by `Arc` with the components that report into it; there is no
//! process-wide registry.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_grid_core::diagnostics::{Diagnostics, GridWarning, WarningCode};
//!
//! let diagnostics = Arc::new(Diagnostics::new());
//! diagnostics.warning.connect(|w| println!("grid warning #{}: {}", w.code.code(), w.message));
//!
//! diagnostics.report(GridWarning::missing_parent("row-7", "row-3"));
//! assert_eq!(diagnostics.count(WarningCode::MissingParent), 1);
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::signal::Signal;

/// Default number of warnings retained by a [`Diagnostics`] registry.
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

/// Stable numeric codes for every warning the engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum WarningCode {
    /// A row's declared parent id matches no node.
    MissingParent = 1,
    /// Attaching a row under its declared parent would create a cycle.
    CycleDetected = 2,
    /// An externally supplied selection state failed validation.
    InvalidSelectionState = 3,
    /// More than one node was passed while multi-row selection is disabled.
    SingleSelectionViolation = 4,
    /// A removed row still had children, which were re-resolved.
    OrphanedChildren = 5,
    /// An update or remove referenced a row id that does not exist.
    RowNotFound = 6,
    /// Selected nodes were enumerated after select-all had been used.
    SelectAllEnumeration = 7,
    /// The same row id appeared more than once in one batch.
    DuplicateRowId = 8,
}

impl WarningCode {
    /// All codes, in numeric order.
    pub const ALL: [WarningCode; 8] = [
        WarningCode::MissingParent,
        WarningCode::CycleDetected,
        WarningCode::InvalidSelectionState,
        WarningCode::SingleSelectionViolation,
        WarningCode::OrphanedChildren,
        WarningCode::RowNotFound,
        WarningCode::SelectAllEnumeration,
        WarningCode::DuplicateRowId,
    ];

    /// Returns the numeric value of this code.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Looks a code up by its numeric value.
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or(Error::UnknownWarningCode(code))
    }

    /// Short machine-friendly name.
    pub fn name(self) -> &'static str {
        match self {
            WarningCode::MissingParent => "missing_parent",
            WarningCode::CycleDetected => "cycle_detected",
            WarningCode::InvalidSelectionState => "invalid_selection_state",
            WarningCode::SingleSelectionViolation => "single_selection_violation",
            WarningCode::OrphanedChildren => "orphaned_children",
            WarningCode::RowNotFound => "row_not_found",
            WarningCode::SelectAllEnumeration => "select_all_enumeration",
            WarningCode::DuplicateRowId => "duplicate_row_id",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// One structured warning: `{ code, message, context }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridWarning {
    /// Stable warning code.
    pub code: WarningCode,
    /// Human readable message.
    pub message: String,
    /// Offending ids and other details, keyed by name.
    pub context: BTreeMap<String, String>,
}

impl GridWarning {
    /// Creates a warning without context.
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    /// Adds a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Returns a context value by key.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    /// A row whose parent id resolves to nothing was placed at root level.
    pub fn missing_parent(row_id: &str, parent_id: &str) -> Self {
        Self::new(
            WarningCode::MissingParent,
            format!("row '{row_id}' references parent '{parent_id}' which does not exist; showing it at root level"),
        )
        .with_context("rowId", row_id)
        .with_context("parentId", parent_id)
    }

    /// A parent link was broken to keep the forest acyclic.
    pub fn cycle_detected(row_id: &str, parent_id: &str) -> Self {
        Self::new(
            WarningCode::CycleDetected,
            format!("attaching row '{row_id}' under '{parent_id}' would create a cycle; showing it at root level"),
        )
        .with_context("rowId", row_id)
        .with_context("parentId", parent_id)
    }

    /// Children of a removed row had to be re-resolved.
    pub fn orphaned_children(row_id: &str, orphans: &[String]) -> Self {
        Self::new(
            WarningCode::OrphanedChildren,
            format!("removed row '{row_id}' still had {} child row(s)", orphans.len()),
        )
        .with_context("rowId", row_id)
        .with_context("orphans", orphans.join(","))
    }

    /// An update or removal named an unknown row.
    pub fn row_not_found(row_id: &str, operation: &str) -> Self {
        Self::new(
            WarningCode::RowNotFound,
            format!("could not {operation} row '{row_id}': no row with this id exists"),
        )
        .with_context("rowId", row_id)
        .with_context("operation", operation)
    }

    /// The same id was supplied twice in one batch.
    pub fn duplicate_row_id(row_id: &str) -> Self {
        Self::new(
            WarningCode::DuplicateRowId,
            format!("duplicate row id '{row_id}' in one batch; the later record replaces the earlier one"),
        )
        .with_context("rowId", row_id)
    }

    /// More than one node was passed in single selection mode.
    pub fn single_selection_violation(node_count: usize) -> Self {
        Self::new(
            WarningCode::SingleSelectionViolation,
            format!("cannot select {node_count} rows while multiple row selection is disabled"),
        )
        .with_context("nodeCount", node_count.to_string())
    }

    /// A selection state was rejected.
    pub fn invalid_selection_state(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(
            WarningCode::InvalidSelectionState,
            format!("invalid selection state: {reason}"),
        )
        .with_context("reason", reason)
    }

    /// Selected nodes were enumerated after select-all was used.
    pub fn select_all_enumeration() -> Self {
        Self::new(
            WarningCode::SelectAllEnumeration,
            "selected nodes cannot be reliably enumerated once select all has been used; read the selection state instead",
        )
    }
}

impl fmt::Display for GridWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning #{}: {}", self.code.code(), self.message)
    }
}

/// Collects, logs and broadcasts [`GridWarning`]s.
pub struct Diagnostics {
    history: Mutex<VecDeque<GridWarning>>,
    history_limit: usize,
    suppress_logging: AtomicBool,
    /// Emitted for every reported warning.
    pub warning: Signal<GridWarning>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// Creates a registry retaining up to [`DEFAULT_HISTORY_LIMIT`] warnings.
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Creates a registry retaining at most `limit` warnings (oldest dropped first).
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            history: Mutex::new(VecDeque::new()),
            history_limit: limit,
            suppress_logging: AtomicBool::new(false),
            warning: Signal::new(),
        }
    }

    /// When set, warnings are logged at debug level instead of warn level.
    ///
    /// Recording and signal emission are unaffected.
    pub fn set_suppress_logging(&self, suppress: bool) {
        self.suppress_logging.store(suppress, Ordering::SeqCst);
    }

    /// Records, logs and emits a warning.
    pub fn report(&self, warning: GridWarning) {
        if self.suppress_logging.load(Ordering::SeqCst) {
            tracing::debug!(
                target: "horizon_grid_core::diagnostics",
                code = warning.code.code(),
                context = ?warning.context,
                "{}",
                warning.message
            );
        } else {
            tracing::warn!(
                target: "horizon_grid_core::diagnostics",
                code = warning.code.code(),
                context = ?warning.context,
                "{}",
                warning.message
            );
        }

        {
            let mut history = self.history.lock();
            if self.history_limit > 0 {
                if history.len() == self.history_limit {
                    history.pop_front();
                }
                history.push_back(warning.clone());
            }
        }

        self.warning.emit(warning);
    }

    /// Returns a copy of the retained warnings, oldest first.
    pub fn warnings(&self) -> Vec<GridWarning> {
        self.history.lock().iter().cloned().collect()
    }

    /// Returns the retained warnings with the given code.
    pub fn warnings_with_code(&self, code: WarningCode) -> Vec<GridWarning> {
        self.history
            .lock()
            .iter()
            .filter(|w| w.code == code)
            .cloned()
            .collect()
    }

    /// Number of retained warnings with the given code.
    pub fn count(&self, code: WarningCode) -> usize {
        self.history.lock().iter().filter(|w| w.code == code).count()
    }

    /// Total number of retained warnings.
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    /// Returns `true` if no warnings are retained.
    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }

    /// Removes and returns all retained warnings.
    pub fn take(&self) -> Vec<GridWarning> {
        self.history.lock().drain(..).collect()
    }

    /// Drops all retained warnings.
    pub fn clear(&self) {
        self.history.lock().clear();
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("retained", &self.history.lock().len())
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

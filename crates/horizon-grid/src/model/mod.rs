//! Row model for Horizon Grid.
//!
//! This module holds the data structures behind a data grid, independent of
//! any rendering:
//!
//! - Building a forest from flat rows linked by id / parent id
//! - Applying add / update / remove transactions incrementally
//! - Selection with select-all plus exceptions
//! - Number and date filter conditions, and a tree-aware filter stage
//!
//! # Core Types
//!
//! - `RowValue` / `Record`: cell values and a ready-made keyed row type
//! - `RowAccessors`: how the engine reads ids, parent ids and cell values
//! - `RowTree`: the forest, with `RowNode` views into it
//! - `RowTransaction`: a batch of row changes
//! - `SelectionStrategy`: selection state
//! - `FilterModel`: a column filter; `filter_tree` applies a predicate to a tree
//!
//! # Architecture Overview
//!
//! ```text
//! rows ──> RowAccessors ──> RowTree ──────> filter_tree ──> FilteredRows
//!                              │  ▲
//!                              │  └── RowTransaction
//!                              └────> SelectionStrategy (by row id)
//! ```
//!
//! Recoverable problems (missing parents, cycles, rejected selection states)
//! are reported to a shared [`Diagnostics`](horizon_grid_core::Diagnostics)
//! registry rather than returned as errors.

mod filter;
mod filter_stage;
mod node;
mod record;
mod selection;
mod transaction;
mod tree;
mod value;

pub use filter::{
    CombinedFilterModel, Comparator, ConditionKind, FilterCondition, FilterModel, FilterType, JoinOperator,
    ScalarFilterParams, does_filter_pass,
};
pub use filter_stage::{FilterStageOptions, FilteredRows, filter_tree};
pub use node::{FOOTER_ID_PREFIX, RowNode};
pub use record::{ParentIdFn, ParentPresenceFn, Record, RowAccessors, RowData, RowIdFn, ValueGetterFn};
pub use selection::{
    RowSelectionMode, SelectableRow, SelectionChangedEvent, SelectionEventSource, SelectionState,
    SelectionStrategy,
};
pub use transaction::{RowNodeTransaction, RowTransaction};
pub use tree::{MissingParentPolicy, NodeKey, NodeStatus, RowTree, SnapshotNode, TreeSnapshot};
pub use value::RowValue;

//! Prelude module for Horizon Grid.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use horizon_grid::prelude::*;
//! ```

// ============================================================================
// Engine and Options
// ============================================================================

pub use crate::engine::GridEngine;
pub use crate::options::{GridOptions, GridOptionsBuilder};
pub use crate::{GridError, Result};

// ============================================================================
// Rows and Tree
// ============================================================================

pub use crate::model::{
    MissingParentPolicy, NodeStatus, Record, RowAccessors, RowData, RowNode, RowNodeTransaction, RowTransaction,
    RowTree, RowValue,
};

// ============================================================================
// Selection
// ============================================================================

pub use crate::model::{RowSelectionMode, SelectionEventSource, SelectionState, SelectionStrategy};

// ============================================================================
// Filtering
// ============================================================================

pub use crate::model::{
    CombinedFilterModel, ConditionKind, FilterCondition, FilterModel, FilterType, FilteredRows, JoinOperator,
    ScalarFilterParams,
};

// ============================================================================
// Core
// ============================================================================

pub use horizon_grid_core::{Diagnostics, GridWarning, Signal, WarningCode};

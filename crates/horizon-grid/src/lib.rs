//! Horizon Grid - the data engine behind a data grid.
//!
//! This is the main crate: it builds a row tree from flat records, applies
//! transactions to it, tracks selection, and filters rows by column.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_grid::prelude::*;
//!
//! let mut engine = GridEngine::from_options(GridOptions::default(), Arc::new(Diagnostics::new()));
//! engine.set_row_data(vec![
//!     Record::new().with("id", "A"),
//!     Record::new().with("id", "B").with("parentId", "A"),
//! ]);
//! assert_eq!(engine.tree().snapshot().to_compact_string(), "A(B)");
//! ```

pub use horizon_grid_core::{Diagnostics, GridWarning, Signal, WarningCode};

pub mod engine;
mod error;
pub mod model;
pub mod options;
pub mod prelude;

pub use engine::GridEngine;
pub use error::{GridError, GridError as Error, Result};
pub use options::{GridOptions, GridOptionsBuilder};

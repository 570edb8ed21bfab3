//! Core systems for Horizon Grid.
//!
//! This crate provides the shared plumbing of the Horizon Grid data engine:
//!
//! - **Signals**: synchronous, type-safe change notifications
//! - **Diagnostics**: the structured warning channel every engine component
//!   reports recoverable problems into
//! - **Logging**: `tracing` targets, span names, and a tree dump formatter
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_grid_core::{Diagnostics, GridWarning, Signal};
//!
//! let diagnostics = Arc::new(Diagnostics::new());
//! let rows_changed = Signal::<usize>::new();
//!
//! rows_changed.connect(|n| println!("{n} rows changed"));
//! rows_changed.emit(2);
//!
//! diagnostics.report(GridWarning::cycle_detected("a", "a"));
//! assert_eq!(diagnostics.len(), 1);
//! ```

pub mod diagnostics;
mod error;
pub mod logging;
pub mod signal;

pub use diagnostics::{Diagnostics, GridWarning, WarningCode};
pub use error::{Error, Result};
pub use logging::{DebugTree, PerfSpan, TreeFormatOptions, TreeFormatter, TreeStyle};
pub use signal::{ConnectionGuard, ConnectionId, Signal};

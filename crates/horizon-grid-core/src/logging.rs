//! Logging and debugging facilities for Horizon Grid.
//!
//! This module provides:
//! - Target and span names for filtering `tracing` output by subsystem
//! - A text formatter for dumping hierarchies (row trees) while debugging
//! - [`PerfSpan`] for timing engine operations
//!
//! # Tracing Integration
//!
//! Horizon Grid uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_grid::tree=debug,horizon_grid_core::diagnostics=warn")
//!     .init();
//! ```

use std::fmt::Write as FmtWrite;

/// Span names used throughout Horizon Grid for tracing.
pub mod span_names {
    /// Full tree rebuild from row data.
    pub const TREE_BUILD: &str = "horizon_grid::tree_build";
    /// Application of one transaction batch.
    pub const TRANSACTION: &str = "horizon_grid::transaction";
    /// Filter stage evaluation over a tree.
    pub const FILTER_STAGE: &str = "horizon_grid::filter_stage";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_grid_core";
    /// Signal emission.
    pub const SIGNAL: &str = "horizon_grid_core::signal";
    /// Diagnostic warnings.
    pub const DIAGNOSTICS: &str = "horizon_grid_core::diagnostics";
    /// Parent-id tree builder.
    pub const TREE: &str = "horizon_grid::tree";
    /// Transaction applier.
    pub const TRANSACTION: &str = "horizon_grid::transaction";
    /// Selection strategy.
    pub const SELECTION: &str = "horizon_grid::selection";
    /// Filter model and filter stage.
    pub const FILTER: &str = "horizon_grid::filter";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Indentation only.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            max_depth: None,
            indent_size: 2,
        }
    }
}

/// A hierarchy that can be dumped by [`TreeFormatter`].
pub trait DebugTree {
    /// Handle for one entry of the hierarchy.
    type Key: Copy;

    /// Top-level entries in display order.
    fn roots(&self) -> Vec<Self::Key>;

    /// Children of an entry in display order.
    fn children(&self, key: Self::Key) -> Vec<Self::Key>;

    /// Single-line label for an entry.
    fn label(&self, key: Self::Key) -> String;
}

/// Formats any [`DebugTree`] as indented text.
#[derive(Debug, Clone, Default)]
pub struct TreeFormatter {
    options: TreeFormatOptions,
}

impl TreeFormatter {
    /// Create a formatter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a formatter with custom options.
    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole hierarchy.
    pub fn format<T: DebugTree>(&self, tree: &T) -> String {
        let mut output = String::new();
        let roots = tree.roots();
        if roots.is_empty() {
            output.push_str("(empty)\n");
            return output;
        }
        // (key, depth, is_last), popped in display order.
        let mut stack: Vec<(T::Key, usize, bool)> = Vec::new();
        let count = roots.len();
        stack.extend(
            roots
                .into_iter()
                .enumerate()
                .rev()
                .map(|(i, root)| (root, 0, i + 1 == count)),
        );

        while let Some((key, depth, is_last)) = stack.pop() {
            if self.options.max_depth.is_some_and(|max| depth > max) {
                continue;
            }

            let prefix = self.build_prefix(depth, is_last);
            let _ = writeln!(output, "{}{}", prefix, tree.label(key));

            let children = tree.children(key);
            let child_count = children.len();
            stack.extend(
                children
                    .into_iter()
                    .enumerate()
                    .rev()
                    .map(|(i, child)| (child, depth + 1, i + 1 == child_count)),
            );
        }
        output
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => (" ", "", ""),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }

        if self.options.style == TreeStyle::Compact {
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        } else {
            prefix.push_str(if is_last { last } else { corner });
            prefix.push(' ');
        }

        prefix
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for tracking the duration of engine operations.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::debug_span!(target: "horizon_grid::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

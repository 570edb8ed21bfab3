//! Tree-aware filtering.
//!
//! The filter stage decides which nodes of a [`RowTree`] stay visible under
//! a row predicate:
//!
//! - a node with data is kept if it passes the predicate;
//! - a node (group or filler) is kept if any of its children is kept;
//! - with tree data, every descendant of a passing node is kept too, unless
//!   `exclude_children_when_tree_data_filtering` is set.

use std::collections::{HashMap, HashSet};

use horizon_grid_core::PerfSpan;
use horizon_grid_core::logging::span_names;

use super::node::{FOOTER_ID_PREFIX, RowNode};
use super::tree::{NodeKey, RowTree};

/// How the filter stage treats hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterStageOptions {
    /// Rows form a tree: passing parents keep their descendants.
    pub tree_data: bool,
    /// Descendants of a passing parent must pass on their own.
    pub exclude_children_when_tree_data_filtering: bool,
}

/// Result of running the filter stage over a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredRows {
    roots: Vec<String>,
    children: HashMap<String, Vec<String>>,
    visible: HashSet<String>,
}

impl FilteredRows {
    /// Every node of the tree, unfiltered.
    pub fn unfiltered<R>(tree: &RowTree<R>) -> Self {
        filter_tree(tree, FilterStageOptions::default(), |_| true)
    }

    /// `true` if the node with this id is shown.
    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.contains(id)
    }

    /// Visible root-level ids in display order.
    pub fn root_ids(&self) -> &[String] {
        &self.roots
    }

    /// Visible children of a node in display order.
    pub fn children_after_filter(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of visible nodes.
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Visible ids depth first, parents before children.
    pub fn displayed_ids(&self) -> Vec<String> {
        self.flatten(false)
    }

    /// Like [`displayed_ids`](Self::displayed_ids), with a
    /// `rowGroupFooter_<id>` entry after the visible children of each group.
    pub fn displayed_ids_with_footers(&self) -> Vec<String> {
        self.flatten(true)
    }

    fn flatten(&self, footers: bool) -> Vec<String> {
        enum Step<'a> {
            Enter(&'a str),
            Footer(&'a str),
        }

        let mut out = Vec::with_capacity(self.visible.len());
        let mut stack: Vec<Step<'_>> = self.roots.iter().rev().map(|id| Step::Enter(id)).collect();
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(id) => {
                    out.push(id.to_string());
                    let children = self.children_after_filter(id);
                    if footers && !children.is_empty() {
                        stack.push(Step::Footer(id));
                    }
                    stack.extend(children.iter().rev().map(|child| Step::Enter(child)));
                }
                Step::Footer(id) => out.push(format!("{FOOTER_ID_PREFIX}{id}")),
            }
        }
        out
    }
}

/// Runs the filter stage.
///
/// `predicate` is only asked about nodes with data; fillers are kept solely
/// through their children or a passing ancestor. The walk uses an explicit
/// stack, so deep trees are fine.
pub fn filter_tree<R, F>(tree: &RowTree<R>, options: FilterStageOptions, predicate: F) -> FilteredRows
where
    F: Fn(&RowNode<'_, R>) -> bool,
{
    enum Step {
        Enter { key: NodeKey, include_all: bool },
        Exit { key: NodeKey, passes: bool, children: usize },
    }

    let _perf = PerfSpan::new(span_names::FILTER_STAGE);

    let mut result = FilteredRows::default();
    // One entry per finished node: its id if kept.
    let mut finished: Vec<Option<String>> = Vec::new();
    let mut stack: Vec<Step> = tree
        .root_nodes()
        .iter()
        .rev()
        .map(|node| Step::Enter {
            key: node.key(),
            include_all: false,
        })
        .collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter { key, include_all } => {
                let Some(node) = tree.node_by_key(key) else {
                    finished.push(None);
                    continue;
                };
                let passes = include_all || (node.data().is_some() && predicate(&node));
                let include_children = options.tree_data
                    && (include_all || (passes && !options.exclude_children_when_tree_data_filtering));
                let children = node.children();
                stack.push(Step::Exit {
                    key,
                    passes,
                    children: children.len(),
                });
                stack.extend(children.iter().rev().map(|child| Step::Enter {
                    key: child.key(),
                    include_all: include_children,
                }));
            }
            Step::Exit { key, passes, children } => {
                let kept_children: Vec<String> = finished
                    .split_off(finished.len().saturating_sub(children))
                    .into_iter()
                    .flatten()
                    .collect();
                if !passes && kept_children.is_empty() {
                    finished.push(None);
                    continue;
                }
                let Some(node) = tree.node_by_key(key) else {
                    finished.push(None);
                    continue;
                };
                let id = node.id().into_owned();
                if !kept_children.is_empty() {
                    result.children.insert(id.clone(), kept_children);
                }
                result.visible.insert(id.clone());
                finished.push(Some(id));
            }
        }
    }
    result.roots = finished.into_iter().flatten().collect();

    tracing::debug!(
        target: "horizon_grid::filter",
        visible = result.visible.len(),
        total = tree.len(),
        "filter stage complete"
    );
    result
}

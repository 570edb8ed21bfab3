//! Borrowed node views.

use std::borrow::Cow;
use std::fmt;

use super::tree::{NodeKey, NodeStatus, RowTree};

/// Prefix of the id of a group's footer row.
pub const FOOTER_ID_PREFIX: &str = "rowGroupFooter_";

/// A read-only view of one node of a [`RowTree`].
///
/// A view can also stand for the footer (group total) row of a group, see
/// [`RowNode::footer`]. Footers are not stored in the tree; they share the
/// group's key and point back at it through [`RowNode::sibling`].
pub struct RowNode<'a, R> {
    tree: &'a RowTree<R>,
    key: NodeKey,
    footer: bool,
}

impl<R> Clone for RowNode<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for RowNode<'_, R> {}

impl<'a, R> RowNode<'a, R> {
    pub(super) fn new(tree: &'a RowTree<R>, key: NodeKey) -> Self {
        Self {
            tree,
            key,
            footer: false,
        }
    }

    fn group_id(&self) -> &'a str {
        self.tree
            .nodes
            .get(self.key)
            .map_or("", |node| node.id.as_str())
    }

    /// Key of the underlying node. A footer shares its group's key.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// The node id. Footers are named `rowGroupFooter_<groupId>`.
    pub fn id(&self) -> Cow<'a, str> {
        if self.footer {
            Cow::Owned(format!("{FOOTER_ID_PREFIX}{}", self.group_id()))
        } else {
            Cow::Borrowed(self.group_id())
        }
    }

    /// The last record supplied for this id. `None` for fillers and footers.
    pub fn data(&self) -> Option<&'a R> {
        if self.footer {
            return None;
        }
        self.tree.nodes.get(self.key).and_then(|node| node.data.as_ref())
    }

    /// The parent id the record declares, which may not resolve.
    pub fn declared_parent_id(&self) -> Option<&'a str> {
        if self.footer {
            return None;
        }
        self.tree
            .nodes
            .get(self.key)
            .and_then(|node| node.declared_parent.as_deref())
    }

    /// Resolved parent, `None` at root level. A footer's parent is its group.
    pub fn parent(&self) -> Option<RowNode<'a, R>> {
        if self.footer {
            return Some(RowNode::new(self.tree, self.key));
        }
        self.tree
            .nodes
            .get(self.key)
            .and_then(|node| node.parent)
            .map(|parent| RowNode::new(self.tree, parent))
    }

    /// Children in display order.
    pub fn children(&self) -> Vec<RowNode<'a, R>> {
        if self.footer {
            return Vec::new();
        }
        self.tree
            .nodes
            .get(self.key)
            .map(|node| {
                node.children
                    .iter()
                    .map(|&child| RowNode::new(self.tree, child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        if self.footer {
            return 0;
        }
        self.tree
            .nodes
            .get(self.key)
            .map_or(0, |node| node.children.len())
    }

    /// `true` if the node has at least one child.
    pub fn is_group(&self) -> bool {
        self.child_count() > 0
    }

    /// `true` if the node has no children.
    pub fn is_leaf(&self) -> bool {
        !self.is_group()
    }

    /// `true` for placeholder nodes that exist only as a parent.
    pub fn is_filler(&self) -> bool {
        !self.footer
            && self
                .tree
                .nodes
                .get(self.key)
                .is_some_and(|node| node.is_filler())
    }

    /// `true` for a group's footer row.
    pub fn is_footer(&self) -> bool {
        self.footer
    }

    /// How the node was placed.
    pub fn status(&self) -> NodeStatus {
        self.tree
            .nodes
            .get(self.key)
            .map_or(NodeStatus::Root, |node| node.status)
    }

    /// Position in row order. `None` for fillers and footers.
    pub fn source_index(&self) -> Option<u64> {
        if self.footer {
            return None;
        }
        self.tree
            .nodes
            .get(self.key)
            .filter(|node| !node.is_filler())
            .map(|node| node.source_index)
    }

    /// Depth from the root: root-level nodes are level 0, footers sit one
    /// level below their group.
    pub fn level(&self) -> usize {
        let mut level = usize::from(self.footer);
        let mut current = self.tree.nodes.get(self.key).and_then(|node| node.parent);
        while let Some(key) = current {
            level += 1;
            if level > self.tree.nodes.len() {
                break;
            }
            current = self.tree.nodes.get(key).and_then(|node| node.parent);
        }
        level
    }

    /// The footer row of a group, `None` for leaves and footers.
    pub fn footer(&self) -> Option<RowNode<'a, R>> {
        (!self.footer && self.is_group()).then(|| RowNode {
            tree: self.tree,
            key: self.key,
            footer: true,
        })
    }

    /// For a footer, the group it totals; for a group, its footer.
    pub fn sibling(&self) -> Option<RowNode<'a, R>> {
        if self.footer {
            Some(RowNode::new(self.tree, self.key))
        } else {
            self.footer()
        }
    }
}

impl<R> PartialEq for RowNode<'_, R> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.key == other.key && self.footer == other.footer
    }
}

impl<R> Eq for RowNode<'_, R> {}

impl<R> fmt::Debug for RowNode<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowNode")
            .field("id", &self.id())
            .field("status", &self.status())
            .field("children", &self.child_count())
            .field("filler", &self.is_filler())
            .field("footer", &self.footer)
            .finish()
    }
}

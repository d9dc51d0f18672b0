//! Topic tree node.

use core::fmt;

use super::mask::TokenMask;
use crate::dirmult::DirMult;

/// Stable arena id of a node.
pub type NodeId = usize;

/// One LDA in the hierarchy.
///
/// A node at level `l` owns `K[l]` topics; for every topic except at the
/// deepest level it has one child, in topic order.
#[derive(Debug, Clone)]
pub struct TopicNode {
    /// Arena id.
    pub id: NodeId,
    /// Rank among siblings, equal to the parent topic that routes here.
    pub index: usize,
    /// Depth from the root (root = 0).
    pub level: usize,
    /// Parent id; `None` for the root.
    pub parent: Option<NodeId>,
    /// Child ids in topic order.
    pub children: Vec<NodeId>,
    /// Word distributions of this node's topics.
    pub topics: Vec<DirMult>,
    /// Tokens routed through this node.
    pub mask: Option<TokenMask>,
}

impl TopicNode {
    pub(crate) fn new(id: NodeId, index: usize, level: usize, parent: Option<NodeId>) -> Self {
        Self {
            id,
            index,
            level,
            parent,
            children: Vec::new(),
            topics: Vec::new(),
            mask: None,
        }
    }

    /// Check if this is the root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Check if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of valid tokens, if the mask is known.
    pub fn valid_count(&self) -> Option<usize> {
        self.mask.as_ref().map(TokenMask::count)
    }

    /// Topic `k` of this node.
    pub fn topic(&self, k: usize) -> Option<&DirMult> {
        self.topics.get(k)
    }

    /// Token mass of every topic.
    pub fn topic_masses(&self) -> Vec<u64> {
        self.topics.iter().map(DirMult::count_sum).collect()
    }
}

impl fmt::Display for TopicNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node[{}] L{} #{} ({} topics, {} children)",
            self.id,
            self.level,
            self.index,
            self.topics.len(),
            self.children.len()
        )
    }
}

//! Arena-backed topic tree.

use super::mask::TokenMask;
use super::node::{NodeId, TopicNode};

/// A rooted tree of [`TopicNode`]s addressed by [`NodeId`].
///
/// The root is always node 0. Children are appended in topic order, so a
/// node's `index` equals its position in its parent's `children`.
#[derive(Debug, Clone)]
pub struct TopicTree {
    nodes: Vec<TopicNode>,
    /// Branching factor per level.
    ks: Vec<usize>,
}

impl TopicTree {
    /// Root id.
    pub const ROOT: NodeId = 0;

    /// Create a tree holding only an untrained root.
    pub fn new(ks: Vec<usize>) -> Self {
        Self {
            nodes: vec![TopicNode::new(Self::ROOT, 0, 0, None)],
            ks,
        }
    }

    /// Branching factor per level.
    pub fn ks(&self) -> &[usize] {
        &self.ks
    }

    /// Number of levels.
    pub fn depth(&self) -> usize {
        self.ks.len()
    }

    /// The root node.
    pub fn root(&self) -> &TopicNode {
        &self.nodes[Self::ROOT]
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&TopicNode> {
        self.nodes.get(id)
    }

    /// Get a node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not in the arena.
    pub fn node(&self, id: NodeId) -> &TopicNode {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut TopicNode {
        &mut self.nodes[id]
    }

    /// Append a child under `parent`. Its index is the next free topic slot.
    pub fn add_child(&mut self, parent: NodeId, mask: Option<TokenMask>) -> NodeId {
        let id = self.nodes.len();
        let level = self.nodes[parent].level + 1;
        let index = self.nodes[parent].children.len();
        let mut node = TopicNode::new(id, index, level, Some(parent));
        node.mask = mask;
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    /// Child of `parent` that topic `k` routes to.
    pub fn child(&self, parent: NodeId, k: usize) -> Option<NodeId> {
        self.nodes.get(parent).and_then(|n| n.children.get(k).copied())
    }

    /// Sibling indices from the root (inclusive) down to `id`.
    pub fn path_indices(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::with_capacity(self.nodes[id].level + 1);
        let mut current = Some(id);
        while let Some(c) = current {
            let node = &self.nodes[c];
            path.push(node.index);
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// Colon-delimited path, e.g. `0:2:1`.
    pub fn path_string(&self, id: NodeId) -> String {
        let parts: Vec<String> = self
            .path_indices(id)
            .iter()
            .map(|i| i.to_string())
            .collect();
        parts.join(":")
    }

    /// Node ids in pre-order, children visited in topic order.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// Node ids at one level, in pre-order.
    pub fn level_nodes(&self, level: usize) -> Vec<NodeId> {
        self.depth_first()
            .into_iter()
            .filter(|&id| self.nodes[id].level == level)
            .collect()
    }

    /// Leaf ids in pre-order.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.depth_first()
            .into_iter()
            .filter(|&id| self.nodes[id].is_leaf())
            .collect()
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = &TopicNode> {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(ks: &[usize]) -> TopicTree {
        let mut tree = TopicTree::new(ks.to_vec());
        let mut frontier = vec![TopicTree::ROOT];
        for level in 0..ks.len() - 1 {
            let mut next = Vec::new();
            for id in frontier {
                for _ in 0..ks[level] {
                    next.push(tree.add_child(id, None));
                }
            }
            frontier = next;
        }
        tree
    }

    #[test]
    fn test_paths() {
        let tree = complete(&[3, 2, 2]);
        assert_eq!(tree.len(), 1 + 3 + 6);
        let c2 = tree.child(TopicTree::ROOT, 2).unwrap();
        let c21 = tree.child(c2, 1).unwrap();
        assert_eq!(tree.path_string(TopicTree::ROOT), "0");
        assert_eq!(tree.path_string(c21), "0:2:1");
        assert_eq!(tree.path_indices(c21), vec![0, 2, 1]);
        assert_eq!(tree.node(c21).level, 2);
        assert!(tree.child(c21, 0).is_none());
    }

    #[test]
    fn test_depth_first_parents_precede_children() {
        let tree = complete(&[2, 3, 1]);
        let order = tree.depth_first();
        assert_eq!(order.len(), tree.len());
        let strings: Vec<String> = order.iter().map(|&id| tree.path_string(id)).collect();
        assert_eq!(&strings[..4], &["0", "0:0", "0:0:0", "0:0:1"]);
        for (pos, &id) in order.iter().enumerate() {
            if let Some(parent) = tree.node(id).parent {
                let ppos = order.iter().position(|&x| x == parent).unwrap();
                assert!(ppos < pos);
            }
        }
        assert_eq!(tree.leaves().len(), 6);
        assert_eq!(tree.level_nodes(1).len(), 2);
    }
}

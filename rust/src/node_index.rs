//! Dense positions for the nodes of one compilation.
//!
//! Graph passes work on `NodeId`s so per-node state lives in plain vectors
//! rather than string-keyed maps.

use rustc_hash::FxHashMap;

use crate::nodes::TestNode;

/// Position of a node in its index.
pub type NodeId = u32;

/// Test ids of a node list, numbered in list order.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    positions: FxHashMap<String, NodeId>,
    ids: Vec<String>,
}

impl NodeIndex {
    /// Index `nodes` in list order. A repeated id keeps its first position.
    pub fn from_nodes(nodes: &[TestNode]) -> Self {
        let mut index = Self {
            positions: FxHashMap::with_capacity_and_hasher(nodes.len(), Default::default()),
            ids: Vec::with_capacity(nodes.len()),
        };
        for node in nodes {
            if !index.positions.contains_key(&node.id) {
                index.positions.insert(node.id.clone(), index.ids.len() as NodeId);
                index.ids.push(node.id.clone());
            }
        }
        index
    }

    #[inline]
    pub fn position(&self, id: &str) -> Option<NodeId> {
        self.positions.get(id).copied()
    }

    /// Test id at `node`. Panics on positions this index did not issue.
    #[inline]
    pub fn id(&self, node: NodeId) -> &str {
        &self.ids[node as usize]
    }

    /// Owned test ids for a sequence of positions.
    pub fn ids_of<I>(&self, nodes: I) -> Vec<String>
    where
        I: IntoIterator<Item = NodeId>,
    {
        nodes.into_iter().map(|n| self.id(n).to_string()).collect()
    }

    /// Positions of the prerequisites of `node` that are indexed, in declared
    /// order, without repeats.
    pub fn prerequisites_of(&self, node: &TestNode) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = Vec::with_capacity(node.prerequisites.len());
        for p in node.prerequisites.iter().filter_map(|id| self.position(id)) {
            if !found.contains(&p) {
                found.push(p);
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

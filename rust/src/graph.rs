//! Induced dependency graph and pessimistic critical path.

use std::collections::VecDeque;
use thiserror::Error;

use crate::node_index::{NodeId, NodeIndex};
use crate::nodes::TestNode;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Ids left unprocessed by the topological sort, sorted.
    #[error("Circular prerequisite chain among selected tests: {0:?}")]
    Cycle(Vec<String>),
}

/// Longest prerequisite chain under worst-case durations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CriticalPath {
    /// Node ids in topological order.
    pub order: Vec<String>,
    /// Root-first chain ending at the node with the latest finish.
    pub path: Vec<String>,
    /// Earliest finish (weeks) of the last node on `path`.
    pub length_weeks: u32,
}

/// Array-indexed view of a node list. Edges run prerequisite → dependent
/// and only between nodes in the list.
pub struct DependencyGraph {
    index: NodeIndex,
    weeks_high: Vec<u32>,
    prerequisites: Vec<Vec<NodeId>>,
    dependents: Vec<Vec<NodeId>>,
}

impl DependencyGraph {
    pub fn new(nodes: &[TestNode]) -> Self {
        let index = NodeIndex::from_nodes(nodes);
        let n = index.len();

        let mut weeks_high = vec![0u32; n];
        let mut prerequisites: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<NodeId>> = vec![Vec::new(); n];

        let mut filled = vec![false; n];
        for node in nodes {
            let Some(id) = index.position(&node.id) else {
                continue;
            };
            let idx = id as usize;
            // A repeated id keeps its first entry.
            if std::mem::replace(&mut filled[idx], true) {
                continue;
            }
            weeks_high[idx] = node.weeks.high;
            prerequisites[idx] = index.prerequisites_of(node);
            for &p in &prerequisites[idx] {
                dependents[p as usize].push(id);
            }
        }

        Self {
            index,
            weeks_high,
            prerequisites,
            dependents,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Kahn's algorithm. Roots are seeded in node-list order and dependents
    /// are released in the order their edges were added, so the result is
    /// a function of the node list alone.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let n = self.len();
        let mut in_degree: Vec<usize> = self.prerequisites.iter().map(Vec::len).collect();

        let mut queue: VecDeque<NodeId> = (0..n as NodeId)
            .filter(|&id| in_degree[id as usize] == 0)
            .collect();
        let mut result: Vec<NodeId> = Vec::with_capacity(n);

        while let Some(id) = queue.pop_front() {
            result.push(id);
            for &dependent in &self.dependents[id as usize] {
                let idx = dependent as usize;
                in_degree[idx] -= 1;
                if in_degree[idx] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if result.len() != n {
            let mut stuck: Vec<String> = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.index.id(i as NodeId).to_string())
                .collect();
            stuck.sort();
            return Err(GraphError::Cycle(stuck));
        }

        Ok(result)
    }

    /// Forward pass with `EFT(n) = max(EFT(prerequisites)) + weeks_high(n)`,
    /// then a backward trace from the latest-finishing node along the
    /// latest-finishing prerequisite.
    ///
    /// Ties go to the earliest node in topological order, and among
    /// prerequisites to the first one declared.
    pub fn critical_path(&self) -> Result<CriticalPath, GraphError> {
        let topo = self.topological_order()?;
        let mut eft = vec![0u32; self.len()];

        for &id in &topo {
            let idx = id as usize;
            let start = self.prerequisites[idx]
                .iter()
                .map(|&p| eft[p as usize])
                .max()
                .unwrap_or(0);
            eft[idx] = start.saturating_add(self.weeks_high[idx]);
        }

        let order = self.index.ids_of(topo.iter().copied());

        let mut last: Option<NodeId> = None;
        for &id in &topo {
            if last.map_or(true, |best| eft[id as usize] > eft[best as usize]) {
                last = Some(id);
            }
        }
        let Some(mut current) = last else {
            return Ok(CriticalPath::default());
        };
        let length_weeks = eft[current as usize];

        let mut chain = vec![current];
        loop {
            let mut best: Option<NodeId> = None;
            for &p in &self.prerequisites[current as usize] {
                if best.map_or(true, |b| eft[p as usize] > eft[b as usize]) {
                    best = Some(p);
                }
            }
            match best {
                Some(p) => {
                    chain.push(p);
                    current = p;
                }
                None => break,
            }
        }
        chain.reverse();

        Ok(CriticalPath {
            order,
            path: self.index.ids_of(chain),
            length_weeks,
        })
    }
}

//! Greedy clustering of tests that can run side by side.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

use crate::nodes::TestNode;

/// One pass over `nodes` in the given order. Each unvisited node seeds a
/// group and pulls in the unvisited tests it declares parallel with, unless
/// the two are directly prerequisite-linked. Membership is not transitive:
/// only the seed's own list is consulted. Every member is marked visited;
/// only groups of two or more are returned, each sorted by id.
pub fn parallel_groups(nodes: &[TestNode]) -> Vec<Vec<String>> {
    let by_id: FxHashMap<&str, &TestNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut visited: FxHashSet<&str> = FxHashSet::default();
    let mut groups = Vec::new();

    for node in nodes {
        if visited.contains(node.id.as_str()) {
            continue;
        }
        let mut group: BTreeSet<&str> = BTreeSet::new();
        group.insert(node.id.as_str());

        for other_id in &node.parallel_with {
            let Some(other) = by_id.get(other_id.as_str()) else {
                continue;
            };
            if visited.contains(other.id.as_str()) || linked(node, other) {
                continue;
            }
            group.insert(other.id.as_str());
        }

        visited.extend(group.iter().copied());
        if group.len() > 1 {
            groups.push(group.into_iter().map(str::to_string).collect());
        }
    }

    groups
}

fn linked(a: &TestNode, b: &TestNode) -> bool {
    a.prerequisites.contains(&b.id) || b.prerequisites.contains(&a.id)
}

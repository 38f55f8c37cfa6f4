//! Aggregate cost and schedule estimates.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::library::{CostEstimate, WeekEstimate};
use crate::nodes::TestNode;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Rollup {
    pub cost: CostEstimate,
    pub weeks: WeekEstimate,
}

impl Rollup {
    /// Cost sums every node not flagged waivable; a potential waiver is
    /// counted as exercised. Weeks sum only the critical path, assuming
    /// everything off it runs in parallel.
    pub fn compute(nodes: &[TestNode], critical_path: &[String]) -> Self {
        let cost = nodes
            .iter()
            .filter(|n| !n.waivable)
            .fold(CostEstimate::default(), |acc, n| acc + n.cost);

        let by_id: FxHashMap<&str, &TestNode> =
            nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let weeks = critical_path
            .iter()
            .filter_map(|id| by_id.get(id.as_str()))
            .fold(WeekEstimate::default(), |acc, n| acc + n.weeks);

        Self { cost, weeks }
    }
}

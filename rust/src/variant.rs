//! Differences between a baseline roadmap and a hypothetical one.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::compiler::RoadmapResult;

/// `a - b`, clamped to the `i64` range.
fn signed_difference(a: u64, b: u64) -> i64 {
    let delta = i128::from(a) - i128::from(b);
    i64::try_from(delta).unwrap_or(if delta > 0 { i64::MAX } else { i64::MIN })
}

/// Signed low/high difference. Positive means the hypothetical is cheaper
/// or shorter than the baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Savings {
    pub low: i64,
    pub high: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RoadmapDiff {
    /// Selected in the baseline only, sorted.
    pub tests_eliminated: Vec<String>,
    /// Selected in the hypothetical only, sorted.
    pub tests_added: Vec<String>,
    /// Selected in both, waivable only in the hypothetical.
    pub newly_waivable: Vec<String>,
    pub cost_saved: Savings,
    pub weeks_saved: Savings,
}

impl RoadmapDiff {
    pub fn between(baseline: &RoadmapResult, hypothetical: &RoadmapResult) -> Self {
        let base = baseline.selected_ids();
        let hypo = hypothetical.selected_ids();

        let tests_eliminated: Vec<String> =
            base.difference(&hypo).map(|id| id.to_string()).collect();
        let tests_added: Vec<String> = hypo.difference(&base).map(|id| id.to_string()).collect();

        let newly_waivable = hypothetical
            .tests
            .iter()
            .filter(|n| n.waivable)
            .filter(|n| baseline.node(&n.id).is_some_and(|b| !b.waivable))
            .map(|n| n.id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            tests_eliminated,
            tests_added,
            newly_waivable,
            cost_saved: Savings {
                low: signed_difference(baseline.total_cost.low, hypothetical.total_cost.low),
                high: signed_difference(baseline.total_cost.high, hypothetical.total_cost.high),
            },
            weeks_saved: Savings {
                low: i64::from(baseline.total_weeks.low) - i64::from(hypothetical.total_weeks.low),
                high: i64::from(baseline.total_weeks.high)
                    - i64::from(hypothetical.total_weeks.high),
            },
        }
    }

    /// The hypothetical saves money or time in the optimistic case.
    pub fn is_improvement(&self) -> bool {
        self.cost_saved.low > 0 || self.weeks_saved.low > 0
    }
}

//! Load-time integrity checks for rule libraries.

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use super::{
    EndpointMatrix, LibraryError, MatrixKey, TestSpec, WaiverToken, MAX_TEST_COST, MAX_TEST_WEEKS,
};
use crate::models::ContactDuration;

/// Non-fatal library findings. Logged at load; the affected ids are
/// dropped when a compilation would otherwise select them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibraryWarning {
    /// Matrix slot names a test the catalog does not define.
    UnknownMatrixTest {
        key: MatrixKey,
        duration: ContactDuration,
        test: String,
    },
    /// Matrix row lacks a duration column.
    MissingMatrixSlot {
        key: MatrixKey,
        duration: ContactDuration,
    },
    /// Marked waivable but names no waiver token, so it can never be waived.
    WaivableWithoutTokens(String),
}

impl fmt::Display for LibraryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMatrixTest {
                key,
                duration,
                test,
            } => write!(f, "matrix slot {key}/{duration} names unknown test {test}"),
            Self::MissingMatrixSlot { key, duration } => {
                write!(f, "matrix slot {key}/{duration} is not defined")
            }
            Self::WaivableWithoutTokens(id) => {
                write!(f, "test {id} is waivable but lists no waiver tokens")
            }
        }
    }
}

/// Map ids to catalog positions, rejecting duplicates.
pub(super) fn build_index(tests: &[TestSpec]) -> Result<FxHashMap<String, usize>, LibraryError> {
    let mut index = FxHashMap::with_capacity_and_hasher(tests.len(), Default::default());
    for (i, spec) in tests.iter().enumerate() {
        if index.insert(spec.id.clone(), i).is_some() {
            return Err(LibraryError::DuplicateTest(spec.id.clone()));
        }
    }
    Ok(index)
}

pub(super) fn check_ranges(tests: &[TestSpec]) -> Result<(), LibraryError> {
    for spec in tests {
        if !spec.cost.is_ordered() {
            return Err(LibraryError::InvertedCost {
                test: spec.id.clone(),
                low: spec.cost.low,
                high: spec.cost.high,
            });
        }
        if !spec.weeks.is_ordered() {
            return Err(LibraryError::InvertedWeeks {
                test: spec.id.clone(),
                low: spec.weeks.low,
                high: spec.weeks.high,
            });
        }
        if spec.weeks.high > MAX_TEST_WEEKS {
            return Err(LibraryError::EstimateTooLarge {
                test: spec.id.clone(),
                field: "weeks",
                value: u64::from(spec.weeks.high),
                max: u64::from(MAX_TEST_WEEKS),
            });
        }
        if spec.cost.high > MAX_TEST_COST {
            return Err(LibraryError::EstimateTooLarge {
                test: spec.id.clone(),
                field: "cost",
                value: spec.cost.high,
                max: MAX_TEST_COST,
            });
        }
    }
    Ok(())
}

/// Every token a test names must have a material set in the library.
pub(super) fn check_waiver_tokens(
    tests: &[TestSpec],
    waiver_materials: &BTreeMap<WaiverToken, BTreeSet<String>>,
) -> Result<(), LibraryError> {
    for spec in tests {
        if let Some(token) = spec
            .waived_by
            .iter()
            .find(|token| !waiver_materials.contains_key(*token))
        {
            return Err(LibraryError::UnknownWaiverToken {
                test: spec.id.clone(),
                token: token.to_string(),
            });
        }
    }
    Ok(())
}

pub(super) fn check_references(
    tests: &[TestSpec],
    index: &FxHashMap<String, usize>,
) -> Result<(), LibraryError> {
    for spec in tests {
        for prerequisite in &spec.prerequisites {
            if *prerequisite == spec.id {
                return Err(LibraryError::SelfPrerequisite(spec.id.clone()));
            }
            if !index.contains_key(prerequisite) {
                return Err(LibraryError::UnknownPrerequisite {
                    test: spec.id.clone(),
                    prerequisite: prerequisite.clone(),
                });
            }
        }
        for target in &spec.parallel_with {
            if !index.contains_key(target) {
                return Err(LibraryError::UnknownParallel {
                    test: spec.id.clone(),
                    target: target.clone(),
                });
            }
        }
    }
    Ok(())
}

pub(super) fn check_gateway(
    tests: &[TestSpec],
    index: &FxHashMap<String, usize>,
    gateway: &str,
) -> Result<(), LibraryError> {
    let Some(&i) = index.get(gateway) else {
        return Err(LibraryError::MissingGateway(gateway.to_string()));
    };
    if tests[i].waivable {
        return Err(LibraryError::WaivableGateway(gateway.to_string()));
    }
    Ok(())
}

/// Kahn's algorithm over the full prerequisite relation. Any test left
/// unprocessed sits on, or downstream of, a cycle.
pub(super) fn check_acyclic(
    tests: &[TestSpec],
    index: &FxHashMap<String, usize>,
) -> Result<(), LibraryError> {
    let n = tests.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, spec) in tests.iter().enumerate() {
        for prerequisite in &spec.prerequisites {
            if let Some(&p) = index.get(prerequisite) {
                in_degree[i] += 1;
                dependents[p].push(i);
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut processed = 0usize;

    while let Some(i) = queue.pop_front() {
        processed += 1;
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if processed != n {
        let mut stuck: Vec<String> = (0..n)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| tests[i].id.clone())
            .collect();
        stuck.sort();
        return Err(LibraryError::Cycle(stuck));
    }

    Ok(())
}

pub(super) fn matrix_warnings(
    matrix: &EndpointMatrix,
    index: &FxHashMap<String, usize>,
) -> Vec<LibraryWarning> {
    let mut warnings = Vec::new();

    for key in MatrixKey::ALL {
        for duration in ContactDuration::ALL {
            if matrix.slot(key, duration).is_empty() {
                warnings.push(LibraryWarning::MissingMatrixSlot { key, duration });
            }
        }
    }

    for (key, duration, ids) in matrix.slots() {
        for id in ids {
            if !index.contains_key(id) {
                warnings.push(LibraryWarning::UnknownMatrixTest {
                    key,
                    duration,
                    test: id.clone(),
                });
            }
        }
    }

    warnings
}

pub(super) fn waiver_warnings(tests: &[TestSpec]) -> Vec<LibraryWarning> {
    tests
        .iter()
        .filter(|spec| spec.waivable && spec.waived_by.is_empty())
        .map(|spec| LibraryWarning::WaivableWithoutTokens(spec.id.clone()))
        .collect()
}

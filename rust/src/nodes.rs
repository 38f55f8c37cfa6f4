//! Per-invocation test nodes.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::flags::DeviceFlags;
use crate::library::{CostEstimate, RuleLibrary, TestSpec, WaiverToken, WeekEstimate};
use crate::models::{RegulatoryPathway, TestPhase};
use crate::waiver::WaiverSet;

pub const NOVEL_MATERIAL_RATIONALE: &str = "WAIVER NOT AVAILABLE: Novel material detected. \
New testing data is required. Existing-data waivers require identical material grade, \
processing and sterilization.";

const JUSTIFICATION_NOTE: &str =
    "Provide written justification in the biocompatibility risk assessment section.";

/// A selected test, with edges restricted to the selection and its waiver
/// status resolved for this compilation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestNode {
    pub id: String,
    pub name: String,
    pub standard: String,
    pub description: String,
    pub phase: TestPhase,
    /// Prerequisites that are also selected. Empty means a graph root.
    pub prerequisites: Vec<String>,
    pub parallel_with: Vec<String>,
    pub cost: CostEstimate,
    pub weeks: WeekEstimate,
    pub waivable: bool,
    pub waiver_rationale: Option<String>,
    pub waived_by: Vec<WaiverToken>,
    pub pathways: Vec<RegulatoryPathway>,
    pub notes: String,
}

impl TestNode {
    pub fn from_spec(
        spec: &TestSpec,
        selected: &BTreeSet<String>,
        waivers: &WaiverSet,
        flags: &DeviceFlags,
    ) -> Self {
        let active = |ids: &[String]| -> Vec<String> {
            ids.iter().filter(|id| selected.contains(*id)).cloned().collect()
        };
        let (waivable, waiver_rationale) = resolve_waiver(spec, waivers, flags);

        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            standard: spec.standard.clone(),
            description: spec.description.clone(),
            phase: spec.phase,
            prerequisites: active(&spec.prerequisites),
            parallel_with: active(&spec.parallel_with),
            cost: spec.cost,
            weeks: spec.weeks,
            waivable,
            waiver_rationale,
            waived_by: spec.waived_by.clone(),
            pathways: spec.pathways.clone(),
            notes: spec.notes.clone(),
        }
    }
}

/// Waivable flag and rationale for one spec.
///
/// A novel material overrides everything else. Otherwise a waivable spec
/// stays waivable only if one of its tokens is active.
fn resolve_waiver(
    spec: &TestSpec,
    waivers: &WaiverSet,
    flags: &DeviceFlags,
) -> (bool, Option<String>) {
    if !spec.waivable {
        return (false, spec.waiver_rationale.clone());
    }
    if flags.has_novel_material {
        return (false, Some(NOVEL_MATERIAL_RATIONALE.to_string()));
    }
    if waivers.admits(&spec.waived_by) {
        let rationale = match &spec.waiver_rationale {
            Some(r) => format!("POTENTIALLY WAIVABLE: {r} {JUSTIFICATION_NOTE}"),
            None => format!("POTENTIALLY WAIVABLE: {JUSTIFICATION_NOTE}"),
        };
        return (true, Some(rationale));
    }
    (false, spec.waiver_rationale.clone())
}

/// Build nodes for every selected id, in id order. Ids the library does
/// not define are skipped.
pub fn build_nodes(
    selected: &BTreeSet<String>,
    library: &RuleLibrary,
    waivers: &WaiverSet,
    flags: &DeviceFlags,
) -> Vec<TestNode> {
    selected
        .iter()
        .filter_map(|id| library.get(id))
        .map(|spec| TestNode::from_spec(spec, selected, waivers, flags))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(name: &str) -> WaiverToken {
        WaiverToken::new(name).unwrap()
    }

    fn selected(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prerequisites_are_filtered_to_selection() {
        let library = RuleLibrary::embedded().unwrap();
        let spec = library.get("ISO_10993_3_CARCINO").unwrap();
        let set = selected(&["ISO_10993_3_CARCINO", "CHEM_CHAR_FULL", "ISO_10993_REPRO"]);
        let node = TestNode::from_spec(spec, &set, &WaiverSet::default(), &DeviceFlags::default());
        assert_eq!(node.prerequisites, vec!["CHEM_CHAR_FULL"]);
        assert_eq!(node.parallel_with, vec!["ISO_10993_REPRO"]);
    }

    #[test]
    fn test_waivable_when_token_active() {
        let library = RuleLibrary::embedded().unwrap();
        let spec = library.get("ISO_10993_5").unwrap();
        let waivers: WaiverSet = [token("established_biocompatibility_data")]
            .into_iter()
            .collect();
        let node = TestNode::from_spec(spec, &selected(&[]), &waivers, &DeviceFlags::default());
        assert!(node.waivable);
        let rationale = node.waiver_rationale.unwrap();
        assert!(rationale.starts_with("POTENTIALLY WAIVABLE:"));
        assert!(rationale.ends_with(JUSTIFICATION_NOTE));
    }

    #[test]
    fn test_not_waivable_without_matching_token() {
        let library = RuleLibrary::embedded().unwrap();
        let spec = library.get("ISO_10993_6_IMPLANT").unwrap();
        let waivers: WaiverSet = [token("usp_class_vi")].into_iter().collect();
        let node = TestNode::from_spec(spec, &selected(&[]), &waivers, &DeviceFlags::default());
        assert!(!node.waivable);
        assert_eq!(node.waiver_rationale, spec.waiver_rationale);
    }

    #[test]
    fn test_novel_material_overrides_active_tokens() {
        let library = RuleLibrary::embedded().unwrap();
        let spec = library.get("ISO_10993_5").unwrap();
        let waivers: WaiverSet = library.waiver_sets().map(|(t, _)| t.clone()).collect();
        let flags = DeviceFlags {
            has_novel_material: true,
            ..Default::default()
        };
        let node = TestNode::from_spec(spec, &selected(&[]), &waivers, &flags);
        assert!(!node.waivable);
        assert_eq!(node.waiver_rationale.as_deref(), Some(NOVEL_MATERIAL_RATIONALE));
    }

    #[test]
    fn test_build_nodes_skips_unknown_ids() {
        let library = RuleLibrary::embedded().unwrap();
        let nodes = build_nodes(
            &selected(&["RISK_ASSESSMENT", "NOT_A_TEST"]),
            &library,
            &WaiverSet::default(),
            &DeviceFlags::default(),
        );
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].prerequisites.is_empty());
    }
}

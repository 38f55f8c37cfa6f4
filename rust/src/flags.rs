//! Per-invocation routing flags derived from a classification.
//!
//! Each flag is computed on its own from the classification and the library
//! keyword sets. None reads another flag; combining them is the selector's
//! job.

use serde::Serialize;

use crate::library::{KeywordSets, RuleLibrary};
use crate::models::{
    Classification, LeadCenter, MechanismOfAction, ProductCategory, RegulatoryPathway,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeviceFlags {
    pub is_sterile: bool,
    pub is_reusable: bool,
    pub has_software: bool,
    pub is_electrical: bool,
    pub is_networked: bool,
    pub has_absorbable: bool,
    pub has_nano: bool,
    pub has_novel_material: bool,
    pub has_in_situ_polymerizing: bool,
    pub is_extracorporeal_blood: bool,
    pub is_ivd: bool,
    pub is_cber: bool,
    pub needs_clinical: bool,
    pub is_510k: bool,
}

impl DeviceFlags {
    pub fn derive(classification: &Classification, library: &RuleLibrary) -> Self {
        let profile = &classification.product_profile;
        let text = searchable_text(classification);
        let kw = library.keywords();
        let has = |set: &[String]| KeywordSets::any_in(set, &text);

        Self {
            is_sterile: !has(&kw.non_sterile),
            is_reusable: has(&kw.reusable),
            has_software: profile.has_software_component
                || profile.mechanism_of_action == MechanismOfAction::Software
                || has(&kw.software),
            is_electrical: profile.mechanism_of_action == MechanismOfAction::Electrical
                || has(&kw.electrical),
            is_networked: has(&kw.networked),
            has_absorbable: has(&kw.absorbable),
            has_nano: has(&kw.nano),
            has_novel_material: has(&kw.novel_material),
            has_in_situ_polymerizing: has(&kw.in_situ_polymerizing),
            is_extracorporeal_blood: has(&kw.extracorporeal_blood),
            is_ivd: classification.effective_product_category() == ProductCategory::DiagnosticIvd,
            is_cber: classification.lead_center == LeadCenter::Cber,
            needs_clinical: classification.regulatory_pathway == RegulatoryPathway::Pma,
            is_510k: matches!(
                classification.regulatory_pathway,
                RegulatoryPathway::K510 | RegulatoryPathway::Exempt510k
            ),
        }
    }

    /// Names of the flags that are set, for logging.
    pub fn active(&self) -> Vec<&'static str> {
        [
            ("is_sterile", self.is_sterile),
            ("is_reusable", self.is_reusable),
            ("has_software", self.has_software),
            ("is_electrical", self.is_electrical),
            ("is_networked", self.is_networked),
            ("has_absorbable", self.has_absorbable),
            ("has_nano", self.has_nano),
            ("has_novel_material", self.has_novel_material),
            ("has_in_situ_polymerizing", self.has_in_situ_polymerizing),
            ("is_extracorporeal_blood", self.is_extracorporeal_blood),
            ("is_ivd", self.is_ivd),
            ("is_cber", self.is_cber),
            ("needs_clinical", self.needs_clinical),
            ("is_510k", self.is_510k),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Intended use, raw description and materials, case-folded and joined.
fn searchable_text(classification: &Classification) -> String {
    let profile = &classification.product_profile;
    let mut parts = Vec::with_capacity(profile.materials.len() + 2);
    parts.push(profile.intended_use.as_str());
    parts.push(profile.raw_description.as_str());
    parts.extend(profile.materials.iter().map(String::as_str));
    parts.join(" ").to_lowercase()
}

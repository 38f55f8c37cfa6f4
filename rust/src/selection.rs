//! Test selection: which catalog entries a device must satisfy.
//!
//! Selection runs one of three exclusive tracks. Biologics and in-vitro
//! diagnostics return early with their own fixed sets; everything else goes
//! through the endpoint matrix plus flag and pathway additions. Each rule is
//! a separate step below so it can be exercised on its own.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::contact::{resolve_slots, ContactProfile, MatrixSlot};
use crate::flags::DeviceFlags;
use crate::library::RuleLibrary;
use crate::models::{Classification, RegulatoryPathway};

pub const CHEM_CHAR_SCREENING: &str = "CHEM_CHAR_SCREENING";
pub const CHEM_CHAR_FULL: &str = "CHEM_CHAR_FULL";
pub const STERILITY_SAL: &str = "STERILITY_SAL";
pub const SHELF_LIFE: &str = "SHELF_LIFE";
pub const REUSE_VALIDATION: &str = "REUSE_VALIDATION";
pub const SOFTWARE_IEC62304: &str = "SOFTWARE_IEC62304";
pub const SOFTWARE_CYBER: &str = "SOFTWARE_CYBER";
pub const ELECTRICAL_SAFETY: &str = "ELECTRICAL_SAFETY";
pub const DEGRADATION_ASSESS: &str = "DEGRADATION_ASSESS";
pub const NANO_CHAR: &str = "NANO_CHAR";
pub const MECHANICAL_PERF: &str = "MECHANICAL_PERF";
pub const IVD_ANALYTICAL_PERF: &str = "IVD_ANALYTICAL_PERF";
pub const CLINICAL_STUDY: &str = "CLINICAL_STUDY";
pub const SUBMISSION_510K_PREP: &str = "SUBMISSION_510K_PREP";
pub const SUBMISSION_PMA_PREP: &str = "SUBMISSION_PMA_PREP";

/// Biologics track, excluding the gateway.
pub const BIOLOGIC_TESTS: [&str; 4] = [
    "CBER_CMC_PACKAGE",
    "CBER_PRECLINICAL",
    "CBER_IND_PREP",
    "SUBMISSION_IND_BLA_PREP",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Biologic,
    InVitroDiagnostic,
    Device,
}

/// Outcome of test selection for one classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub track: Track,
    /// Matrix slots consulted; empty outside the device track.
    pub slots: Vec<MatrixSlot>,
    /// Selected ids, all present in the library.
    pub ids: BTreeSet<String>,
    /// Ids a rule asked for that the library does not define.
    pub dropped: Vec<String>,
}

pub fn select(
    classification: &Classification,
    flags: &DeviceFlags,
    library: &RuleLibrary,
) -> Selection {
    let mut ids = BTreeSet::new();
    ids.insert(library.gateway_id().to_string());

    let (track, slots) = if flags.is_cber || classification.regulatory_pathway.is_biologic() {
        add_biologic_track(&mut ids);
        (Track::Biologic, Vec::new())
    } else if flags.is_ivd {
        add_diagnostic_track(&mut ids, flags);
        (Track::InVitroDiagnostic, Vec::new())
    } else {
        let profile = &classification.product_profile;
        let slots = resolve_slots(
            &ContactProfile {
                category: profile.contact_category,
                duration: profile.contact_duration,
                intended_use: &profile.intended_use,
                is_implantable: profile.is_implantable,
            },
            library.keywords(),
        );
        add_matrix_tests(&mut ids, &slots, library);
        add_flag_tests(&mut ids, flags);
        add_pathway_documents(&mut ids, classification.regulatory_pathway);
        promote_chemical_characterization(&mut ids);
        (Track::Device, slots)
    };

    let dropped = retain_known(&mut ids, library);
    if !dropped.is_empty() {
        tracing::warn!(?dropped, "unknown test ids skipped");
    }

    Selection {
        track,
        slots,
        ids,
        dropped,
    }
}

fn insert_all(ids: &mut BTreeSet<String>, new: &[&str]) {
    ids.extend(new.iter().map(|id| id.to_string()));
}

pub fn add_biologic_track(ids: &mut BTreeSet<String>) {
    insert_all(ids, &BIOLOGIC_TESTS);
}

/// Analytical performance replaces biocompatibility entirely.
pub fn add_diagnostic_track(ids: &mut BTreeSet<String>, flags: &DeviceFlags) {
    ids.insert(IVD_ANALYTICAL_PERF.to_string());
    if flags.is_510k {
        ids.insert(SUBMISSION_510K_PREP.to_string());
    }
}

pub fn add_matrix_tests(ids: &mut BTreeSet<String>, slots: &[MatrixSlot], library: &RuleLibrary) {
    for &(key, duration) in slots {
        ids.extend(library.matrix().slot(key, duration).iter().cloned());
    }
}

pub fn add_flag_tests(ids: &mut BTreeSet<String>, flags: &DeviceFlags) {
    if flags.is_sterile {
        insert_all(ids, &[STERILITY_SAL, SHELF_LIFE]);
    }
    if flags.is_reusable {
        insert_all(ids, &[REUSE_VALIDATION]);
    }
    if flags.has_software {
        insert_all(ids, &[SOFTWARE_IEC62304]);
        if flags.is_networked {
            insert_all(ids, &[SOFTWARE_CYBER]);
        }
    }
    if flags.is_electrical {
        insert_all(ids, &[ELECTRICAL_SAFETY]);
    }
    if flags.has_absorbable || flags.has_in_situ_polymerizing {
        insert_all(ids, &[DEGRADATION_ASSESS]);
    }
    if flags.has_nano {
        insert_all(ids, &[NANO_CHAR]);
    }
    if !flags.is_ivd {
        insert_all(ids, &[MECHANICAL_PERF]);
    }
}

pub fn add_pathway_documents(ids: &mut BTreeSet<String>, pathway: RegulatoryPathway) {
    match pathway {
        RegulatoryPathway::K510 => insert_all(ids, &[SUBMISSION_510K_PREP]),
        RegulatoryPathway::Pma => insert_all(ids, &[CLINICAL_STUDY, SUBMISSION_PMA_PREP]),
        _ => {}
    }
}

/// Full chemical characterization supersedes the screening tier.
pub fn promote_chemical_characterization(ids: &mut BTreeSet<String>) {
    if ids.contains(CHEM_CHAR_FULL) {
        ids.remove(CHEM_CHAR_SCREENING);
    }
}

/// Drop ids the library does not define, returning them.
pub fn retain_known(ids: &mut BTreeSet<String>, library: &RuleLibrary) -> Vec<String> {
    let mut dropped = Vec::new();
    ids.retain(|id| {
        let known = library.contains(id);
        if !known {
            dropped.push(id.clone());
        }
        known
    });
    dropped
}

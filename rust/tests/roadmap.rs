//! End-to-end compilation against the embedded rule library.

use std::collections::BTreeSet;
use std::sync::Arc;

use biocompat_roadmap::{
    Classification, ContactCategory, ContactDuration, CostEstimate, LeadCenter, MatrixKey,
    ProductCategory, RegulatoryPathway, RoadmapCompiler, RoadmapResult, RuleLibrary, Track,
    WeekEstimate,
};

fn compiler() -> RoadmapCompiler {
    RoadmapCompiler::embedded().unwrap()
}

fn device(
    intended_use: &str,
    category: ContactCategory,
    duration: ContactDuration,
    implantable: bool,
) -> Classification {
    let mut c = Classification::default();
    c.product_profile.intended_use = intended_use.to_string();
    c.product_profile.contact_category = category;
    c.product_profile.contact_duration = duration;
    c.product_profile.is_implantable = implantable;
    c.product_category = ProductCategory::MedicalDevice;
    c.lead_center = LeadCenter::Cdrh;
    c
}

fn blood_implant() -> Classification {
    device(
        "permanent implant, contacts circulating blood and tissue",
        ContactCategory::Implant,
        ContactDuration::Permanent,
        true,
    )
}

fn wound_dressing() -> Classification {
    device(
        "adhesive wound dressing",
        ContactCategory::Surface,
        ContactDuration::Limited,
        false,
    )
    .with_pathway(RegulatoryPathway::K510)
}

fn ids(result: &RoadmapResult) -> BTreeSet<&str> {
    result.selected_ids()
}

fn is_biocompatibility(id: &str) -> bool {
    id.starts_with("ISO_10993")
}

#[test]
fn test_scenario_a_blood_contacting_implant() {
    let compiler = compiler();
    let result = compiler.compile(&blood_implant());
    let selected = ids(&result);

    assert_eq!(
        result.matrix_slots,
        vec![
            (MatrixKey::ImplantBlood, ContactDuration::Permanent),
            (MatrixKey::ImplantTissue, ContactDuration::Permanent),
        ]
    );

    let matrix = compiler.library().matrix();
    for key in [MatrixKey::ImplantBlood, MatrixKey::ImplantTissue] {
        for id in matrix.slot(key, ContactDuration::Permanent) {
            assert!(selected.contains(id.as_str()), "missing {id} from {key}");
        }
    }
    for id in [
        "ISO_10993_4_HEMO_DIRECT",
        "ISO_10993_6_IMPLANT",
        "ISO_10993_3_CARCINO",
        "ISO_10993_REPRO",
    ] {
        assert!(selected.contains(id), "missing {id}");
    }
}

#[test]
fn test_scenario_b_surface_sterile_device() {
    let result = compiler().compile(&wound_dressing());
    let selected = ids(&result);

    for id in [
        "RISK_ASSESSMENT",
        "CHEM_CHAR_SCREENING",
        "ISO_10993_5",
        "ISO_10993_10_SENS",
        "ISO_10993_10_IRR",
        "STERILITY_SAL",
        "SHELF_LIFE",
        "MECHANICAL_PERF",
    ] {
        assert!(selected.contains(id), "missing {id}");
    }
    for id in [
        "ISO_10993_4_HEMO_DIRECT",
        "ISO_10993_4_HEMO_INDIRECT",
        "ISO_10993_6_IMPLANT",
        "SOFTWARE_IEC62304",
        "ELECTRICAL_SAFETY",
    ] {
        assert!(!selected.contains(id), "unexpected {id}");
    }

    // Sterility then shelf life is the longest chain.
    assert_eq!(
        result.critical_path,
        vec!["RISK_ASSESSMENT", "STERILITY_SAL", "SHELF_LIFE"]
    );
    assert_eq!(result.total_weeks, WeekEstimate::new(20, 54));
    assert_eq!(result.total_cost, CostEstimate::new(73_000, 248_000));
}

#[test]
fn test_scenario_c_submission_documents() {
    let compiler = compiler();

    let k510 = compiler.compile(&wound_dressing());
    assert!(ids(&k510).contains("SUBMISSION_510K_PREP"));

    let pma = compiler.compile(&wound_dressing().with_pathway(RegulatoryPathway::Pma));
    let selected = ids(&pma);
    assert!(selected.contains("CLINICAL_STUDY"));
    assert!(selected.contains("SUBMISSION_PMA_PREP"));
    assert!(!selected.contains("SUBMISSION_510K_PREP"));
}

#[test]
fn test_cber_track_is_exactly_the_biologics_set() {
    let mut c = blood_implant();
    c.lead_center = LeadCenter::Cber;
    c.product_profile.materials = vec!["titanium".to_string()];
    let result = compiler().compile(&c);

    let expected: BTreeSet<&str> = [
        "RISK_ASSESSMENT",
        "CBER_CMC_PACKAGE",
        "CBER_PRECLINICAL",
        "CBER_IND_PREP",
        "SUBMISSION_IND_BLA_PREP",
    ]
    .into_iter()
    .collect();
    assert_eq!(result.track, Track::Biologic);
    assert_eq!(ids(&result), expected);
    assert!(result.matrix_slots.is_empty());
}

#[test]
fn test_ind_pathway_without_cber_center_is_biologic() {
    let c = wound_dressing().with_pathway(RegulatoryPathway::Ind);
    let result = compiler().compile(&c);
    assert_eq!(result.track, Track::Biologic);
    assert!(!ids(&result).iter().any(|id| is_biocompatibility(id)));
}

#[test]
fn test_ivd_track_replaces_biocompatibility() {
    let mut c = device(
        "blood glucose assay reagent",
        ContactCategory::ExternalCommunicating,
        ContactDuration::Prolonged,
        false,
    );
    c.product_category = ProductCategory::DiagnosticIvd;
    let result = compiler().compile(&c);
    let selected = ids(&result);

    assert_eq!(result.track, Track::InVitroDiagnostic);
    assert!(selected.contains("IVD_ANALYTICAL_PERF"));
    assert!(selected.contains("RISK_ASSESSMENT"));
    assert!(!selected.iter().any(|id| is_biocompatibility(id)));
    assert!(!selected.contains("MECHANICAL_PERF"));
}

#[test]
fn test_established_materials_make_tests_waivable() {
    let c = blood_implant().with_materials(["Titanium", "PEEK"]);
    let result = compiler().compile(&c);

    assert!(!result.waivers.is_empty());
    assert!(result.waivable_count() > 0);
    let implant = result.node("ISO_10993_6_IMPLANT").unwrap();
    assert!(implant.waivable);
    let gateway = result.node("RISK_ASSESSMENT").unwrap();
    assert!(!gateway.waivable);
}

#[test]
fn test_novel_material_overrides_waivers() {
    let c = blood_implant().with_materials(["titanium", "novel hydrogel coating"]);
    let result = compiler().compile(&c);

    assert!(result.flags.has_novel_material);
    assert!(result.waivers.is_empty());
    assert!(result.tests.iter().all(|n| !n.waivable));
    let cyto = result.node("ISO_10993_5").unwrap();
    assert!(cyto
        .waiver_rationale
        .as_deref()
        .unwrap()
        .starts_with("WAIVER NOT AVAILABLE"));
}

#[test]
fn test_full_chemical_characterization_supersedes_screening() {
    let inputs = [
        blood_implant(),
        device(
            "laparoscope",
            ContactCategory::ExternalCommunicating,
            ContactDuration::Limited,
            false,
        ),
        device(
            "hemodialysis bloodline",
            ContactCategory::ExternalCommunicating,
            ContactDuration::Prolonged,
            false,
        ),
    ];
    let compiler = compiler();
    for c in &inputs {
        let result = compiler.compile(c);
        let selected = result.selected_ids();
        assert!(selected.contains("CHEM_CHAR_FULL"));
        assert!(!selected.contains("CHEM_CHAR_SCREENING"));
    }
}

#[test]
fn test_rollup_laws() {
    let compiler = compiler();
    for c in [
        blood_implant().with_materials(["silicone", "cobalt chrome"]),
        wound_dressing(),
    ] {
        let result = compiler.compile(&c);

        let cost = result
            .tests
            .iter()
            .filter(|n| !n.waivable)
            .fold(CostEstimate::default(), |acc, n| acc + n.cost);
        assert_eq!(result.total_cost, cost);

        let weeks = result
            .critical_path
            .iter()
            .map(|id| result.node(id).unwrap().weeks)
            .fold(WeekEstimate::default(), |acc, w| acc + w);
        assert_eq!(result.total_weeks, weeks);
    }
}

#[test]
fn test_critical_path_is_a_prerequisite_chain() {
    let result = compiler().compile(&blood_implant());
    assert!(!result.critical_path.is_empty());
    let first = result.node(&result.critical_path[0]).unwrap();
    assert!(first.prerequisites.is_empty());
    for pair in result.critical_path.windows(2) {
        let next = result.node(&pair[1]).unwrap();
        assert!(next.prerequisites.contains(&pair[0]), "{pair:?}");
    }
}

#[test]
fn test_parallel_groups_are_independent() {
    let result = compiler().compile(&blood_implant());
    let selected = ids(&result);
    for group in &result.parallel_groups {
        assert!(group.len() > 1);
        for a in group {
            assert!(selected.contains(a.as_str()));
            let node = result.node(a).unwrap();
            for b in group {
                assert!(!node.prerequisites.contains(b), "{a} depends on {b}");
            }
        }
    }
    let mut seen = BTreeSet::new();
    for id in result.parallel_groups.iter().flatten() {
        assert!(seen.insert(id), "{id} in two groups");
    }
}

#[test]
fn test_sparse_input_compiles_conservatively() {
    let c: Classification =
        serde_json::from_str(r#"{"product_profile": {"contact_category": "mucosal"}}"#).unwrap();
    let result = compiler().compile(&c);
    assert_eq!(
        result.matrix_slots,
        vec![(MatrixKey::Surface, ContactDuration::Limited)]
    );
    assert!(ids(&result).contains("RISK_ASSESSMENT"));
    assert!(!result.data_gap_analysis.is_empty());
}

#[test]
fn test_unrecognized_duration_compiles_as_limited() {
    let c: Classification = serde_json::from_str(
        r#"{"product_profile": {"contact_category": "surface", "contact_duration": "chronic"}}"#,
    )
    .unwrap();
    let result = compiler().compile(&c);
    assert_eq!(
        result.matrix_slots,
        vec![(MatrixKey::Surface, ContactDuration::Limited)]
    );
    assert!(ids(&result).contains("ISO_10993_5"));
}

#[test]
fn test_concurrent_compilations_share_one_library() {
    let library = Arc::new(RuleLibrary::embedded().unwrap());
    let compiler = RoadmapCompiler::new(Arc::clone(&library));
    let baseline = blood_implant().with_materials(["316L stainless steel"]);
    let expected = compiler.compile(&baseline);

    let variants: Vec<Classification> = ["titanium", "peek", "polyurethane", "graphene"]
        .iter()
        .map(|m| baseline.with_substitution("316l stainless steel", m))
        .collect();

    let shared = &compiler;
    let results: Vec<RoadmapResult> = std::thread::scope(|s| {
        let handles: Vec<_> = variants
            .iter()
            .map(|v| s.spawn(move || shared.compile(v)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.len(), 4);
    // The baseline is untouched and still compiles to the same roadmap.
    assert_eq!(compiler.compile(&baseline), expected);
    assert_eq!(
        baseline.product_profile.materials,
        vec!["316L stainless steel"]
    );
    for (variant, result) in variants.iter().zip(&results) {
        assert_eq!(&compiler.compile(variant), result);
    }
}

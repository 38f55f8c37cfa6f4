//! Property tests over generated classifications.

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use biocompat_roadmap::{
    Classification, ContactCategory, ContactDuration, LeadCenter, MechanismOfAction,
    ProductCategory, RegulatoryPathway, RoadmapCompiler, Track,
};

fn compiler() -> &'static RoadmapCompiler {
    static COMPILER: OnceLock<RoadmapCompiler> = OnceLock::new();
    COMPILER.get_or_init(|| RoadmapCompiler::embedded().unwrap())
}

const PHRASES: &[&str] = &[
    "",
    "coronary stent",
    "orthopedic bone screw",
    "hemodialysis bloodline",
    "IV set for infusion",
    "adhesive wound dressing",
    "reusable surgical instrument",
    "non-sterile examination glove",
    "battery-powered insulin pump with bluetooth and firmware",
    "bioresorbable PLGA scaffold",
    "nanoparticle coated catheter",
    "novel hydrogel sealant that polymerizes in situ",
    "apheresis circuit",
];

const MATERIALS: &[&str] = &[
    "titanium",
    "PEEK",
    "silicone",
    "polyurethane",
    "316L stainless steel",
    "graphene oxide",
    "proprietary material blend",
    "polylactide",
];

fn pathway() -> impl Strategy<Value = RegulatoryPathway> {
    prop_oneof![
        Just(RegulatoryPathway::Exempt510k),
        Just(RegulatoryPathway::K510),
        Just(RegulatoryPathway::DeNovo),
        Just(RegulatoryPathway::Pma),
        Just(RegulatoryPathway::Ide),
        Just(RegulatoryPathway::Hde),
        Just(RegulatoryPathway::Ind),
        Just(RegulatoryPathway::Bla),
        Just(RegulatoryPathway::CombinationProduct),
        Just(RegulatoryPathway::Unknown),
    ]
}

fn contact() -> impl Strategy<Value = (ContactCategory, ContactDuration)> {
    (
        prop_oneof![
            Just(ContactCategory::None),
            Just(ContactCategory::Surface),
            Just(ContactCategory::ExternalCommunicating),
            Just(ContactCategory::Implant),
            Just(ContactCategory::Unknown),
        ],
        prop_oneof![
            Just(ContactDuration::Limited),
            Just(ContactDuration::Prolonged),
            Just(ContactDuration::Permanent),
        ],
    )
}

fn classification() -> impl Strategy<Value = Classification> {
    (
        pathway(),
        contact(),
        prop_oneof![
            Just(LeadCenter::Cdrh),
            Just(LeadCenter::Cber),
            Just(LeadCenter::Cder),
            Just(LeadCenter::Unknown),
        ],
        prop_oneof![
            Just(ProductCategory::MedicalDevice),
            Just(ProductCategory::DiagnosticIvd),
            Just(ProductCategory::DiagnosticInvivo),
            Just(ProductCategory::Combination),
            Just(ProductCategory::Unknown),
        ],
        prop_oneof![
            Just(MechanismOfAction::Mechanical),
            Just(MechanismOfAction::Electrical),
            Just(MechanismOfAction::Software),
            Just(MechanismOfAction::Unknown),
        ],
        prop::sample::select(PHRASES),
        prop::sample::select(PHRASES),
        prop::sample::subsequence(MATERIALS, 0..4),
        any::<(bool, bool)>(),
    )
        .prop_map(|fields| {
            let (pathway, (category, duration), center, product, mechanism, intended, raw, materials, flags) =
                fields;
            let (implantable, software) = flags;
            let mut c = Classification::default();
            c.regulatory_pathway = pathway;
            c.lead_center = center;
            c.product_category = product;
            c.product_profile.contact_category = category;
            c.product_profile.contact_duration = duration;
            c.product_profile.mechanism_of_action = mechanism;
            c.product_profile.intended_use = intended.to_string();
            c.product_profile.raw_description = raw.to_string();
            c.product_profile.is_implantable = implantable;
            c.product_profile.has_software_component = software;
            c.with_materials(materials)
        })
}

proptest! {
    /// The gateway test is always selected.
    #[test]
    fn gateway_always_present(c in classification()) {
        let result = compiler().compile(&c);
        prop_assert!(result.selected_ids().contains("RISK_ASSESSMENT"));
    }

    /// Every active prerequisite is selected and the node order is topological.
    #[test]
    fn induced_subgraph_is_closed_and_ordered(c in classification()) {
        let result = compiler().compile(&c);
        let selected = result.selected_ids();
        let mut seen = BTreeSet::new();
        for node in &result.tests {
            for p in &node.prerequisites {
                prop_assert!(selected.contains(p.as_str()));
                prop_assert!(seen.contains(p.as_str()), "{} listed before {}", node.id, p);
            }
            for p in &node.parallel_with {
                prop_assert!(selected.contains(p.as_str()));
            }
            seen.insert(node.id.as_str());
        }
    }

    /// Identical input, identical roadmap.
    #[test]
    fn compilation_is_deterministic(c in classification()) {
        let a = compiler().compile(&c);
        let b = compiler().compile(&c.clone());
        prop_assert_eq!(a.selected_ids(), b.selected_ids());
        prop_assert_eq!(&a.critical_path, &b.critical_path);
        prop_assert_eq!(&a.parallel_groups, &b.parallel_groups);
        prop_assert_eq!(a, b);
    }

    /// Biologics and diagnostics never carry ISO 10993 endpoints.
    #[test]
    fn exclusive_tracks_skip_biocompatibility(c in classification()) {
        let result = compiler().compile(&c);
        if result.track != Track::Device {
            prop_assert!(!result.selected_ids().iter().any(|id| id.starts_with("ISO_10993")));
        }
        if c.lead_center == LeadCenter::Cber || c.regulatory_pathway.is_biologic() {
            prop_assert_eq!(result.track, Track::Biologic);
            prop_assert_eq!(result.tests.len(), 5);
        }
    }

    /// A novel material leaves nothing waivable.
    #[test]
    fn novel_material_disables_waivers(c in classification()) {
        let result = compiler().compile(&c);
        if result.flags.has_novel_material {
            prop_assert!(result.waivers.is_empty());
            prop_assert!(result.tests.iter().all(|n| !n.waivable));
        }
    }

    /// Screening chemistry never survives alongside full characterization.
    #[test]
    fn promotion_law_holds(c in classification()) {
        let result = compiler().compile(&c);
        let ids = result.selected_ids();
        prop_assert!(!(ids.contains("CHEM_CHAR_FULL") && ids.contains("CHEM_CHAR_SCREENING")));
    }

    /// Critical path is a root-first chain of selected prerequisites.
    #[test]
    fn critical_path_is_a_chain(c in classification()) {
        let result = compiler().compile(&c);
        prop_assert!(!result.critical_path.is_empty());
        let first = result.node(&result.critical_path[0]).unwrap();
        prop_assert!(first.prerequisites.is_empty());
        for pair in result.critical_path.windows(2) {
            let next = result.node(&pair[1]).unwrap();
            prop_assert!(next.prerequisites.contains(&pair[0]));
        }
    }
}

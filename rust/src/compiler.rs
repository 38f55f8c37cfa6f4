//! Roadmap compilation: classification in, complete roadmap out.
//!
//! A compilation is a pure function of the classification and the shared
//! rule library. All intermediate state (flags, waivers, nodes) lives on the
//! stack of one `compile` call, so a single compiler can serve any number of
//! threads.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::CompilerConfig;
use crate::contact::MatrixSlot;
use crate::flags::DeviceFlags;
use crate::graph::DependencyGraph;
use crate::grouping::parallel_groups;
use crate::library::{CostEstimate, LibraryError, RuleLibrary, WeekEstimate};
use crate::models::Classification;
use crate::narrative::{data_gap_analysis, NarrativeGenerator, NarrativeRequest};
use crate::nodes::{build_nodes, TestNode};
use crate::rollup::Rollup;
use crate::selection::{self, Track};
use crate::variant::RoadmapDiff;
use crate::waiver::WaiverSet;

/// Complete testing roadmap for one classification.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoadmapResult {
    pub classification: Classification,
    pub library_version: String,
    pub effective_date: NaiveDate,
    pub track: Track,
    pub flags: DeviceFlags,
    pub waivers: WaiverSet,
    pub matrix_slots: Vec<MatrixSlot>,
    /// Selected tests in topological order.
    pub tests: Vec<TestNode>,
    pub total_cost: CostEstimate,
    pub total_weeks: WeekEstimate,
    pub critical_path: Vec<String>,
    pub parallel_groups: Vec<Vec<String>>,
    pub data_gap_analysis: String,
    /// Ids requested by selection rules but absent from the library.
    pub dropped_tests: Vec<String>,
}

impl RoadmapResult {
    pub fn selected_ids(&self) -> BTreeSet<&str> {
        self.tests.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn node(&self, id: &str) -> Option<&TestNode> {
        self.tests.iter().find(|n| n.id == id)
    }

    pub fn waivable_count(&self) -> usize {
        self.tests.iter().filter(|n| n.waivable).count()
    }
}

/// One hypothetical compiled against a baseline.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariantOutcome {
    pub label: String,
    pub result: RoadmapResult,
    pub diff: RoadmapDiff,
}

pub struct RoadmapCompiler {
    library: Arc<RuleLibrary>,
    narrator: Option<Arc<dyn NarrativeGenerator>>,
}

impl RoadmapCompiler {
    pub fn new(library: Arc<RuleLibrary>) -> Self {
        Self {
            library,
            narrator: None,
        }
    }

    /// Compiler over the catalog shipped with the crate.
    pub fn embedded() -> Result<Self, LibraryError> {
        Ok(Self::new(Arc::new(RuleLibrary::embedded()?)))
    }

    /// Load the configured library. The narrator is only attached when the
    /// configuration enables narratives.
    pub fn from_config(
        config: &CompilerConfig,
        narrator: Option<Arc<dyn NarrativeGenerator>>,
    ) -> Result<Self, LibraryError> {
        let source = config.rule_source();
        tracing::info!(source = %source.describe(), "loading rule library");
        let compiler = Self::new(Arc::new(source.load()?));
        Ok(match narrator {
            Some(n) if config.narrative_enabled => compiler.with_narrator(n),
            _ => compiler,
        })
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn NarrativeGenerator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn library(&self) -> &Arc<RuleLibrary> {
        &self.library
    }

    pub fn compile(&self, classification: &Classification) -> RoadmapResult {
        let library = self.library.as_ref();
        let profile = &classification.product_profile;
        tracing::info!(
            pathway = %classification.regulatory_pathway,
            category = ?classification.effective_product_category(),
            lead_center = %classification.lead_center,
            "compiling roadmap"
        );

        let flags = DeviceFlags::derive(classification, library);
        let waivers = WaiverSet::resolve(&profile.materials, &flags, library);
        tracing::debug!(flags = ?flags.active(), ?waivers, "derived flags and waivers");

        let selection = selection::select(classification, &flags, library);
        tracing::info!(
            track = ?selection.track,
            tests = selection.ids.len(),
            "selected tests"
        );
        tracing::debug!(slots = ?selection.slots, "matrix slots");

        let mut tests = build_nodes(&selection.ids, library, &waivers, &flags);
        let critical = match DependencyGraph::new(&tests).critical_path() {
            Ok(critical) => critical,
            // RuleLibrary is only constructible through acyclicity checks,
            // and the induced subgraph of a DAG is a DAG.
            Err(e) => panic!("validated rule library produced a cyclic selection: {e}"),
        };

        let position: FxHashMap<&str, usize> = critical
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        tests.sort_by_key(|n| position.get(n.id.as_str()).copied().unwrap_or(usize::MAX));

        let groups = parallel_groups(&tests);
        let rollup = Rollup::compute(&tests, &critical.path);
        tracing::debug!(
            critical_path = ?critical.path,
            weeks = critical.length_weeks,
            groups = groups.len(),
            "scheduled roadmap"
        );

        let request = NarrativeRequest::new(classification, &tests);
        let narrative = data_gap_analysis(self.narrator.as_deref(), &request);

        RoadmapResult {
            classification: classification.clone(),
            library_version: library.version().to_string(),
            effective_date: library.effective_date(),
            track: selection.track,
            flags,
            waivers,
            matrix_slots: selection.slots,
            tests,
            total_cost: rollup.cost,
            total_weeks: rollup.weeks,
            critical_path: critical.path,
            parallel_groups: groups,
            data_gap_analysis: narrative,
            dropped_tests: selection.dropped,
        }
    }

    /// Compile each labelled variant and diff it against `baseline`.
    ///
    /// Variants are owned values, independent of the baseline and of each
    /// other; callers may equally compile them on separate threads.
    pub fn compile_variants<I>(&self, baseline: &RoadmapResult, variants: I) -> Vec<VariantOutcome>
    where
        I: IntoIterator<Item = (String, Classification)>,
    {
        variants
            .into_iter()
            .map(|(label, classification)| {
                let result = self.compile(&classification);
                let diff = RoadmapDiff::between(baseline, &result);
                tracing::debug!(
                    %label,
                    eliminated = diff.tests_eliminated.len(),
                    cost_saved = diff.cost_saved.high,
                    "compiled variant"
                );
                VariantOutcome {
                    label,
                    result,
                    diff,
                }
            })
            .collect()
    }
}

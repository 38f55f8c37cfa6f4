//! Versioned rule library: test catalog, endpoint matrix, waiver materials
//! and keyword sets.
//!
//! A [`RuleLibrary`] can only be obtained through validation, so every live
//! instance has referentially intact prerequisites and an acyclic
//! prerequisite relation. It is immutable and meant to be shared behind an
//! `Arc` by any number of concurrent compilations.

mod source;
mod validation;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Add;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::{ContactDuration, RegulatoryPathway, TestPhase};

pub use source::{EmbeddedSource, FileSource, JsonSource, RuleSource, DEFAULT_LIBRARY_JSON};
pub use validation::LibraryWarning;

/// Fatal rule library problems. These abort startup; they never surface
/// while a roadmap is being compiled.
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Failed to parse rule library: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to read rule library {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Duplicate test id: {0}")]
    DuplicateTest(String),
    #[error("Test {test} lists unknown prerequisite {prerequisite}")]
    UnknownPrerequisite { test: String, prerequisite: String },
    #[error("Test {test} lists unknown parallel-with target {target}")]
    UnknownParallel { test: String, target: String },
    #[error("Test {0} lists itself as a prerequisite")]
    SelfPrerequisite(String),
    #[error("Test {test} has cost range {low}..{high} with low above high")]
    InvertedCost { test: String, low: u64, high: u64 },
    #[error("Test {test} has week range {low}..{high} with low above high")]
    InvertedWeeks { test: String, low: u32, high: u32 },
    #[error("Test {test} has {field} estimate {value} above the limit of {max}")]
    EstimateTooLarge {
        test: String,
        field: &'static str,
        value: u64,
        max: u64,
    },
    #[error("Invalid waiver token {0:?}: expected lowercase letters, digits and underscores")]
    InvalidWaiverToken(String),
    #[error("Test {test} names waiver token {token} with no waiver material set")]
    UnknownWaiverToken { test: String, token: String },
    #[error("Gateway test {0} is not in the catalog")]
    MissingGateway(String),
    #[error("Gateway test {0} must not be waivable")]
    WaivableGateway(String),
    #[error("Circular prerequisite chain among tests: {0:?}")]
    Cycle(Vec<String>),
}

/// Inclusive low/high estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate<T> {
    pub low: T,
    pub high: T,
}

impl<T: PartialOrd> Estimate<T> {
    pub fn new(low: T, high: T) -> Self {
        Self { low, high }
    }

    pub fn is_ordered(&self) -> bool {
        self.low <= self.high
    }
}

// Sums saturate instead of overflowing.
macro_rules! saturating_estimate_add {
    ($($t:ty),*) => {$(
        impl Add for Estimate<$t> {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self {
                    low: self.low.saturating_add(rhs.low),
                    high: self.high.saturating_add(rhs.high),
                }
            }
        }
    )*};
}

saturating_estimate_add!(u32, u64);

/// Cost in US dollars.
pub type CostEstimate = Estimate<u64>;
/// Duration in calendar weeks.
pub type WeekEstimate = Estimate<u32>;

/// Largest per-test duration a library may declare (ten years).
pub const MAX_TEST_WEEKS: u32 = 520;
/// Largest per-test cost a library may declare.
pub const MAX_TEST_COST: u64 = 1_000_000_000;

/// Named condition under which existing data may satisfy a test.
///
/// The set of tokens is whatever the library's `waiver_materials` table
/// defines; names are lowercase snake_case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WaiverToken(String);

impl WaiverToken {
    pub fn new(name: impl Into<String>) -> Result<Self, LibraryError> {
        let name = name.into();
        let well_formed = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        if well_formed {
            Ok(Self(name))
        } else {
            Err(LibraryError::InvalidWaiverToken(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WaiverToken {
    type Error = LibraryError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl From<WaiverToken> for String {
    fn from(token: WaiverToken) -> Self {
        token.0
    }
}

impl Borrow<str> for WaiverToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WaiverToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row of the endpoint matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixKey {
    Surface,
    ExternalCommunicating,
    CirculatingBlood,
    BloodPathIndirect,
    ImplantTissue,
    ImplantBlood,
}

impl MatrixKey {
    pub const ALL: [MatrixKey; 6] = [
        Self::Surface,
        Self::ExternalCommunicating,
        Self::CirculatingBlood,
        Self::BloodPathIndirect,
        Self::ImplantTissue,
        Self::ImplantBlood,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Surface => "surface",
            Self::ExternalCommunicating => "external_communicating",
            Self::CirculatingBlood => "circulating_blood",
            Self::BloodPathIndirect => "blood_path_indirect",
            Self::ImplantTissue => "implant_tissue",
            Self::ImplantBlood => "implant_blood",
        }
    }
}

impl fmt::Display for MatrixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One static test obligation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    pub id: String,
    pub name: String,
    pub standard: String,
    #[serde(default)]
    pub description: String,
    pub phase: TestPhase,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub parallel_with: Vec<String>,
    pub cost: CostEstimate,
    pub weeks: WeekEstimate,
    #[serde(default)]
    pub waivable: bool,
    #[serde(default)]
    pub waiver_rationale: Option<String>,
    #[serde(default)]
    pub waived_by: Vec<WaiverToken>,
    #[serde(default)]
    pub pathways: Vec<RegulatoryPathway>,
    #[serde(default)]
    pub notes: String,
}

/// Contact category × duration → required test ids.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointMatrix(BTreeMap<MatrixKey, BTreeMap<ContactDuration, Vec<String>>>);

impl EndpointMatrix {
    /// Test ids for one slot; empty when the library has no such slot.
    pub fn slot(&self, key: MatrixKey, duration: ContactDuration) -> &[String] {
        self.0
            .get(&key)
            .and_then(|row| row.get(&duration))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = (MatrixKey, ContactDuration, &[String])> {
        self.0.iter().flat_map(|(&key, row)| {
            row.iter()
                .map(move |(&duration, ids)| (key, duration, ids.as_slice()))
        })
    }
}

/// Keyword sets used for contact resolution and flag derivation.
/// All entries are stored case-folded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSets {
    pub blood_implant: Vec<String>,
    pub circulating_blood: Vec<String>,
    pub fluid_path: Vec<String>,
    pub non_sterile: Vec<String>,
    pub reusable: Vec<String>,
    pub software: Vec<String>,
    pub electrical: Vec<String>,
    pub networked: Vec<String>,
    pub absorbable: Vec<String>,
    pub nano: Vec<String>,
    pub novel_material: Vec<String>,
    pub in_situ_polymerizing: Vec<String>,
    pub extracorporeal_blood: Vec<String>,
}

impl KeywordSets {
    /// True if any keyword occurs in `text` (which must already be case-folded).
    pub fn any_in(keywords: &[String], text: &str) -> bool {
        keywords.iter().any(|kw| text.contains(kw.as_str()))
    }

    fn normalize(&mut self) {
        for set in [
            &mut self.blood_implant,
            &mut self.circulating_blood,
            &mut self.fluid_path,
            &mut self.non_sterile,
            &mut self.reusable,
            &mut self.software,
            &mut self.electrical,
            &mut self.networked,
            &mut self.absorbable,
            &mut self.nano,
            &mut self.novel_material,
            &mut self.in_situ_polymerizing,
            &mut self.extracorporeal_blood,
        ] {
            for kw in set.iter_mut() {
                *kw = kw.trim().to_lowercase();
            }
            set.retain(|kw| !kw.is_empty());
        }
    }
}

/// Serialized shape of a rule library document.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct LibraryDocument {
    pub version: String,
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub title: String,
    pub gateway_test: String,
    pub tests: Vec<TestSpec>,
    #[serde(default)]
    pub endpoint_matrix: EndpointMatrix,
    #[serde(default)]
    pub waiver_materials: BTreeMap<WaiverToken, BTreeSet<String>>,
    #[serde(default)]
    pub keywords: KeywordSets,
}

/// Immutable, validated arena of test specifications indexed by id.
#[derive(Debug)]
pub struct RuleLibrary {
    version: String,
    effective_date: NaiveDate,
    title: String,
    gateway: String,
    specs: Vec<TestSpec>,
    index: FxHashMap<String, usize>,
    matrix: EndpointMatrix,
    waiver_materials: BTreeMap<WaiverToken, BTreeSet<String>>,
    keywords: KeywordSets,
    warnings: Vec<LibraryWarning>,
}

impl RuleLibrary {
    /// Parse and validate a library from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, LibraryError> {
        let document: LibraryDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// The catalog shipped with this crate.
    pub fn embedded() -> Result<Self, LibraryError> {
        Self::from_json(DEFAULT_LIBRARY_JSON)
    }

    pub(crate) fn from_document(mut document: LibraryDocument) -> Result<Self, LibraryError> {
        document.keywords.normalize();
        let waiver_materials: BTreeMap<WaiverToken, BTreeSet<String>> = document
            .waiver_materials
            .into_iter()
            .map(|(token, materials)| {
                let normalized = materials
                    .iter()
                    .map(|m| m.trim().to_lowercase())
                    .filter(|m| !m.is_empty())
                    .collect();
                (token, normalized)
            })
            .collect();

        let index = validation::build_index(&document.tests)?;
        validation::check_ranges(&document.tests)?;
        validation::check_references(&document.tests, &index)?;
        validation::check_waiver_tokens(&document.tests, &waiver_materials)?;
        validation::check_gateway(&document.tests, &index, &document.gateway_test)?;
        validation::check_acyclic(&document.tests, &index)?;

        let mut warnings = validation::matrix_warnings(&document.endpoint_matrix, &index);
        warnings.extend(validation::waiver_warnings(&document.tests));
        for warning in &warnings {
            tracing::warn!(version = %document.version, "rule library: {warning}");
        }

        tracing::info!(
            version = %document.version,
            effective_date = %document.effective_date,
            tests = document.tests.len(),
            "rule library loaded"
        );

        Ok(Self {
            version: document.version,
            effective_date: document.effective_date,
            title: document.title,
            gateway: document.gateway_test,
            specs: document.tests,
            index,
            matrix: document.endpoint_matrix,
            waiver_materials,
            keywords: document.keywords,
            warnings,
        })
    }

    pub fn get(&self, id: &str) -> Option<&TestSpec> {
        self.index.get(id).map(|&i| &self.specs[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Specs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &TestSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Id of the mandatory risk-assessment gateway test.
    pub fn gateway_id(&self) -> &str {
        &self.gateway
    }

    pub fn matrix(&self) -> &EndpointMatrix {
        &self.matrix
    }

    pub fn keywords(&self) -> &KeywordSets {
        &self.keywords
    }

    /// Reference material names for a waiver token (case-folded).
    pub fn waiver_materials(&self, token: &str) -> Option<&BTreeSet<String>> {
        self.waiver_materials.get(token)
    }

    /// Every waiver token with its reference materials, in token order.
    pub fn waiver_sets(&self) -> impl Iterator<Item = (&WaiverToken, &BTreeSet<String>)> {
        self.waiver_materials.iter()
    }

    /// Non-fatal findings from load-time validation.
    pub fn warnings(&self) -> &[LibraryWarning] {
        &self.warnings
    }
}

//! Classification input types consumed by the roadmap compiler.
//!
//! These mirror the record produced by the upstream classification step.
//! Every field carries a serde default so that sparse input still decodes,
//! and the catch-all enum variants absorb strings this crate does not know.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// How the device touches the patient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactCategory {
    /// No body contact.
    #[default]
    None,
    /// Intact skin or mucosal membrane.
    Surface,
    /// Blood path, tissue/bone/dentin, or circulating blood via an external device.
    ExternalCommunicating,
    /// Implanted in tissue, bone or blood.
    Implant,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ContactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Surface => "surface",
            Self::ExternalCommunicating => "external_communicating",
            Self::Implant => "implant",
            Self::Unknown => "unknown",
        })
    }
}

/// How long the device stays in contact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactDuration {
    /// Up to 24 hours.
    #[default]
    Limited,
    /// 24 hours to 30 days.
    Prolonged,
    /// Beyond 30 days.
    Permanent,
}

impl ContactDuration {
    pub const ALL: [ContactDuration; 3] = [Self::Limited, Self::Prolonged, Self::Permanent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Limited => "limited",
            Self::Prolonged => "prolonged",
            Self::Permanent => "permanent",
        }
    }
}

impl fmt::Display for ContactDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market-clearance route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegulatoryPathway {
    #[serde(rename = "510k_exempt")]
    Exempt510k,
    #[serde(rename = "510k")]
    K510,
    #[serde(rename = "de_novo")]
    DeNovo,
    #[serde(rename = "pma")]
    Pma,
    #[serde(rename = "ide")]
    Ide,
    #[serde(rename = "hde")]
    Hde,
    #[serde(rename = "ind")]
    Ind,
    #[serde(rename = "bla")]
    Bla,
    #[serde(rename = "combination_product")]
    CombinationProduct,
    #[default]
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl RegulatoryPathway {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exempt510k => "510(k) Exempt",
            Self::K510 => "510(k)",
            Self::DeNovo => "De Novo",
            Self::Pma => "PMA",
            Self::Ide => "IDE",
            Self::Hde => "HDE",
            Self::Ind => "IND",
            Self::Bla => "BLA",
            Self::CombinationProduct => "Combination Product",
            Self::Unknown => "Unknown",
        }
    }

    /// Biologics pathways run the CBER track regardless of lead center.
    pub fn is_biologic(self) -> bool {
        matches!(self, Self::Ind | Self::Bla)
    }
}

impl fmt::Display for RegulatoryPathway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FDA center with primary jurisdiction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadCenter {
    Cdrh,
    Cber,
    Cder,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for LeadCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cdrh => "CDRH",
            Self::Cber => "CBER",
            Self::Cder => "CDER",
            Self::Unknown => "Unknown",
        })
    }
}

/// Top-level product bucket decided before device class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    MedicalDevice,
    CellGeneTherapy,
    DiagnosticIvd,
    DiagnosticInvivo,
    Drug,
    Combination,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MechanismOfAction {
    Mechanical,
    Chemical,
    Biological,
    Electrical,
    Software,
    Combination,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Lifecycle phase a test belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPhase {
    PreSubmission,
    Submission,
    PostMarket,
}

/// Structured extraction of the product description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductProfile {
    pub raw_description: String,
    pub intended_use: String,
    pub indication: String,
    pub product_category: ProductCategory,
    pub mechanism_of_action: MechanismOfAction,
    #[serde(deserialize_with = "lenient_category")]
    pub contact_category: ContactCategory,
    #[serde(deserialize_with = "lenient_duration")]
    pub contact_duration: ContactDuration,
    pub materials: Vec<String>,
    pub is_implantable: bool,
    pub has_software_component: bool,
    pub has_drug_component: bool,
    pub has_biologic_component: bool,
}

/// Decode `T` from a case-folded value, substituting `fallback` for null
/// or anything `T` rejects.
fn lenient<'de, D, T>(deserializer: D, fallback: T) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => serde_json::Value::String(s.trim().to_lowercase()),
        other => other,
    };
    Ok(serde_json::from_value(value).unwrap_or(fallback))
}

fn lenient_category<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ContactCategory, D::Error> {
    lenient(deserializer, ContactCategory::Unknown)
}

/// Shortest duration is the conservative reading of an unusable value.
fn lenient_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ContactDuration, D::Error> {
    lenient(deserializer, ContactDuration::Limited)
}

/// A cleared device cited as substantially equivalent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredicateDevice {
    pub k_number: String,
    pub device_name: String,
    pub applicant: String,
    pub decision_date: String,
    pub similarity_score: f64,
}

/// Output of the classification step; read-only input to the compiler.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub product_profile: ProductProfile,
    pub regulatory_pathway: RegulatoryPathway,
    pub lead_center: LeadCenter,
    pub product_category: ProductCategory,
    pub predicate_devices: Vec<PredicateDevice>,
}

impl Classification {
    /// Copy of this classification with the material list replaced.
    ///
    /// Hypothetical variants must own their data: the baseline and each
    /// variant may be compiled on different threads at the same time.
    pub fn with_materials<I, S>(&self, materials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut variant = self.clone();
        variant.product_profile.materials = materials.into_iter().map(Into::into).collect();
        variant
    }

    /// Copy with one material swapped for another (case-insensitive match).
    pub fn with_substitution(&self, original: &str, replacement: &str) -> Self {
        let target = original.trim().to_lowercase();
        let materials = self.product_profile.materials.iter().map(|m| {
            if m.trim().to_lowercase() == target {
                replacement.to_string()
            } else {
                m.clone()
            }
        });
        self.with_materials(materials)
    }

    pub fn with_pathway(&self, pathway: RegulatoryPathway) -> Self {
        Self {
            regulatory_pathway: pathway,
            ..self.clone()
        }
    }

    pub fn with_contact(&self, category: ContactCategory, duration: ContactDuration) -> Self {
        let mut variant = self.clone();
        variant.product_profile.contact_category = category;
        variant.product_profile.contact_duration = duration;
        variant
    }

    /// Product category, preferring the classification-level value.
    pub fn effective_product_category(&self) -> ProductCategory {
        match self.product_category {
            ProductCategory::Unknown => self.product_profile.product_category,
            category => category,
        }
    }
}

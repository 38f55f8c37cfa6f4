//! Data-gap narrative.
//!
//! The narrative is prose for humans and never feeds back into selection or
//! scheduling. Text generation is delegated to an optional collaborator;
//! whenever it is absent, fails, or returns nothing usable, a templated
//! summary is used so every roadmap carries a narrative.

use thiserror::Error;

use crate::models::Classification;
use crate::nodes::TestNode;

const SYSTEM_PROMPT: &str = "\
You are a regulatory affairs specialist (ISO 10993-1:2018 and the FDA 2023 biocompatibility guidance).
Write a concise 4-6 sentence plain-English analysis covering:
1. Which tests are potentially waivable and what evidence is needed
2. Which tests require new in vitro or in vivo studies
3. The single most time-critical test to initiate first, and why
4. Any FDA-specific procedure notes the team must know (GPMT vs LLNA, hemocompatibility
   track, pyrogenicity method, genotoxicity battery scope)
5. If absorbable materials are present: flag the required pre-test FDA discussion
Reference specific guidance sections. Be direct and specific.";

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("narrative service unavailable: {0}")]
    Unavailable(String),
    #[error("narrative generation failed: {0}")]
    Failed(String),
}

/// Everything a text generator is told about one roadmap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NarrativeRequest {
    pub intended_use: String,
    pub contact: String,
    pub materials: Vec<String>,
    pub pathway: String,
    pub lead_center: String,
    /// Names of tests that need new studies.
    pub required: Vec<String>,
    /// Names of tests that may be covered by existing data.
    pub waivable: Vec<String>,
}

impl NarrativeRequest {
    pub fn new(classification: &Classification, nodes: &[TestNode]) -> Self {
        let profile = &classification.product_profile;
        let (waivable, required): (Vec<&TestNode>, Vec<&TestNode>) =
            nodes.iter().partition(|n| n.waivable);

        Self {
            intended_use: profile.intended_use.clone(),
            contact: format!("{}/{}", profile.contact_category, profile.contact_duration),
            materials: profile.materials.clone(),
            pathway: classification.regulatory_pathway.to_string(),
            lead_center: classification.lead_center.to_string(),
            required: required.iter().map(|n| n.name.clone()).collect(),
            waivable: waivable.iter().map(|n| n.name.clone()).collect(),
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    /// The device-specific message sent alongside the system prompt.
    pub fn user_message(&self) -> String {
        let materials = if self.materials.is_empty() {
            "not specified".to_string()
        } else {
            self.materials.join(", ")
        };
        let waivable = if self.waivable.is_empty() {
            "none".to_string()
        } else {
            self.waivable.join(", ")
        };
        format!(
            "Device: {} | Contact: {}\n\
             Materials: {}\n\
             Pathway: {} | Center: {}\n\
             Required new studies ({}): {}\n\
             Potentially waivable ({}): {}\n",
            self.intended_use,
            self.contact,
            materials,
            self.pathway,
            self.lead_center,
            self.required.len(),
            self.required.join(", "),
            self.waivable.len(),
            waivable,
        )
    }

    /// Deterministic summary used when no generated text is available.
    pub fn fallback(&self) -> String {
        format!(
            "{} required new studies; {} potentially waivable. Initiate risk assessment and \
             chemical characterization first; they gate all subsequent biocompatibility decisions.",
            self.required.len(),
            self.waivable.len()
        )
    }
}

/// External text-generation collaborator.
pub trait NarrativeGenerator: Send + Sync {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError>;
}

/// Generated narrative, or the template when generation is unavailable.
pub fn data_gap_analysis(
    generator: Option<&dyn NarrativeGenerator>,
    request: &NarrativeRequest,
) -> String {
    let Some(generator) = generator else {
        return request.fallback();
    };
    match generator.generate(request) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            tracing::warn!("narrative generator returned empty text, using template");
            request.fallback()
        }
        Err(e) => {
            tracing::warn!(error = %e, "narrative generation failed, using template");
            request.fallback()
        }
    }
}

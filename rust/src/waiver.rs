//! Waiver token resolution from declared materials.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::flags::DeviceFlags;
use crate::library::{RuleLibrary, WaiverToken};

/// Waiver tokens active for one compilation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WaiverSet(BTreeSet<WaiverToken>);

impl WaiverSet {
    /// A token is active when any declared material (trimmed, case-folded)
    /// appears in the token's reference set. A novel material voids every
    /// token.
    pub fn resolve(materials: &[String], flags: &DeviceFlags, library: &RuleLibrary) -> Self {
        if flags.has_novel_material {
            return Self::default();
        }

        let declared: BTreeSet<String> = materials
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();

        let tokens = library
            .waiver_sets()
            .filter(|(_, reference)| !reference.is_disjoint(&declared))
            .map(|(token, _)| token.clone())
            .collect();
        Self(tokens)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    /// True if any of `tokens` is active.
    pub fn admits(&self, tokens: &[WaiverToken]) -> bool {
        tokens.iter().any(|t| self.0.contains(t))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaiverToken> {
        self.0.iter()
    }
}

impl FromIterator<WaiverToken> for WaiverSet {
    fn from_iter<I: IntoIterator<Item = WaiverToken>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

//! Contact profile → endpoint matrix slot resolution.
//!
//! Resolution is a precedence chain, first match wins:
//!
//! 1. implantable and blood keywords in the intended use → implant-blood
//!    *and* implant-tissue
//! 2. implantable, or implant contact category → implant-tissue
//! 3. circulating-blood keywords → circulating-blood
//! 4. external-communicating with fluid-path keywords → blood-path-indirect
//! 5. external-communicating → external-communicating
//! 6. surface → surface
//! 7. anything else → surface
//!
//! Later rules only see inputs the earlier keyword checks rejected, so an
//! implant whose description happens to mention dialysis still resolves to
//! the implant rows.

use crate::library::{KeywordSets, MatrixKey};
use crate::models::{ContactCategory, ContactDuration};

/// One (row, column) cell of the endpoint matrix.
pub type MatrixSlot = (MatrixKey, ContactDuration);

/// Inputs to contact resolution, borrowed from the product profile.
#[derive(Clone, Copy, Debug)]
pub struct ContactProfile<'a> {
    pub category: ContactCategory,
    pub duration: ContactDuration,
    pub intended_use: &'a str,
    pub is_implantable: bool,
}

/// Resolve the matrix slots for a contact profile. Never empty.
pub fn resolve_slots(profile: &ContactProfile<'_>, keywords: &KeywordSets) -> Vec<MatrixSlot> {
    let text = profile.intended_use.to_lowercase();
    let duration = profile.duration;

    if profile.is_implantable && KeywordSets::any_in(&keywords.blood_implant, &text) {
        return vec![
            (MatrixKey::ImplantBlood, duration),
            (MatrixKey::ImplantTissue, duration),
        ];
    }

    if profile.is_implantable || profile.category == ContactCategory::Implant {
        return vec![(MatrixKey::ImplantTissue, duration)];
    }

    if KeywordSets::any_in(&keywords.circulating_blood, &text) {
        return vec![(MatrixKey::CirculatingBlood, duration)];
    }

    let key = match profile.category {
        ContactCategory::ExternalCommunicating
            if KeywordSets::any_in(&keywords.fluid_path, &text) =>
        {
            MatrixKey::BloodPathIndirect
        }
        ContactCategory::ExternalCommunicating => MatrixKey::ExternalCommunicating,
        ContactCategory::Surface => MatrixKey::Surface,
        // Implant was handled above.
        ContactCategory::None | ContactCategory::Unknown | ContactCategory::Implant => {
            MatrixKey::Surface
        }
    };
    vec![(key, duration)]
}

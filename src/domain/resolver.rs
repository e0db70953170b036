//! Best-data resolver: merges several candidate copies of the same profile
//! into one canonical record.
//!
//! Candidates arrive in a fixed order (server copy first, then the pre-sync
//! local copy, then any legacy variants). Scoring is by presence of fields,
//! not timestamps: name +3, profile image +2, medical info +1. The highest
//! score wins and ties keep the earliest candidate, so resolution is fully
//! deterministic for a given candidate order.

use crate::domain::entities::UserProfile;
use crate::domain::value_objects::AccountEmail;

const NAME_WEIGHT: u32 = 3;
const IMAGE_WEIGHT: u32 = 2;
const MEDICAL_WEIGHT: u32 = 1;

pub fn score(profile: &UserProfile) -> u32 {
    let mut score = 0;
    if profile.has_name() {
        score += NAME_WEIGHT;
    }
    if profile.has_image() {
        score += IMAGE_WEIGHT;
    }
    if profile.has_medical_info() {
        score += MEDICAL_WEIGHT;
    }
    score
}

/// Merge candidates into the canonical profile for `email`.
///
/// The winner is the base; its missing fields are back-filled from the other
/// candidates in order, so the result is the field-wise union. No candidate
/// field is ever discarded outright. If nobody has a name, one is derived
/// from the email local part.
pub fn resolve(candidates: &[UserProfile], email: &AccountEmail) -> UserProfile {
    // Strictly-greater comparison keeps the earliest candidate on ties.
    let mut winner: Option<&UserProfile> = None;
    let mut winner_score = 0;
    for candidate in candidates {
        let candidate_score = score(candidate);
        if winner.is_none() || candidate_score > winner_score {
            winner = Some(candidate);
            winner_score = candidate_score;
        }
    }

    let mut merged = winner
        .cloned()
        .unwrap_or_else(|| UserProfile::new(email.clone()));

    for candidate in candidates {
        backfill(&mut merged, candidate);
    }

    merged.email = email.clone();
    if !merged.has_name() {
        merged.name = Some(display_name_from_email(email));
    }
    merged
}

fn backfill(base: &mut UserProfile, other: &UserProfile) {
    if base.id.is_none() {
        base.id = other.id.clone();
    }
    if !base.has_name() && other.has_name() {
        base.name = other.name.clone();
    }
    if base.token.is_none() {
        base.token = other.token.clone();
    }
    if !base.has_image() && other.has_image() {
        base.profile_image = other.profile_image.clone();
    }
    if base.phone.is_none() {
        base.phone = other.phone.clone();
    }
    if base.address.is_none() {
        base.address = other.address.clone();
    }
    if base.age.is_none() {
        base.age = other.age;
    }
    if !base.has_medical_info() && other.has_medical_info() {
        base.medical_info = other.medical_info.clone();
    }
    if base.home_location.is_none() {
        base.home_location = other.home_location.clone();
    }
    if base.updated_at.is_none() {
        base.updated_at = other.updated_at;
    }
    if base.caregiver_name.is_none() {
        base.caregiver_name = other.caregiver_name.clone();
    }
}

/// Deterministic fallback display name from the email local part: split on
/// `.`, `-` and `_`, title-case each segment, join with single spaces.
/// `jane.doe_99@x.com` becomes `Jane Doe 99`.
pub fn display_name_from_email(email: &AccountEmail) -> String {
    email
        .local_part()
        .split(['.', '-', '_'])
        .filter(|segment| !segment.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::AccountEmail;

/// Free-form medical information authored by a caregiver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalInfo {
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
}

impl MedicalInfo {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
            && self.medications.is_empty()
            && self.allergies.is_empty()
            && self.blood_type.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Per-account user profile, the unit the sync coordinator round-trips.
///
/// `email` is the only reliable key. `updated_at` is the sole ordering
/// signal for "is this copy newer" comparisons and is advisory only: local
/// clocks are not synchronized with the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: AccountEmail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Opaque URI or base64 blob. Large and historically prone to being
    /// dropped during merges, hence the redundant store side channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_info: Option<MedicalInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_location: Option<HomeLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Denormalized cache of the linked caregiver's display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver_name: Option<String>,
}

impl UserProfile {
    pub fn new(email: AccountEmail) -> Self {
        Self {
            id: None,
            name: None,
            email,
            token: None,
            profile_image: None,
            phone: None,
            address: None,
            age: None,
            medical_info: None,
            home_location: None,
            updated_at: None,
            caregiver_name: None,
        }
    }

    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
    }

    pub fn has_image(&self) -> bool {
        self.profile_image
            .as_deref()
            .is_some_and(|i| !i.is_empty())
    }

    pub fn has_medical_info(&self) -> bool {
        self.medical_info.as_ref().is_some_and(|m| !m.is_empty())
    }
}

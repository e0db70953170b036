use serde::{Deserialize, Serialize};
use std::fmt;

use super::email::AccountEmail;

/// Caregiver-authored data domains that propagate to patients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDomain {
    Reminders,
    Memories,
    Contacts,
    HomeLocation,
}

impl DataDomain {
    /// Domains that hold record collections. Home location is a single
    /// value with its own legacy source shapes and is handled separately.
    pub const COLLECTIONS: [DataDomain; 3] = [
        DataDomain::Reminders,
        DataDomain::Memories,
        DataDomain::Contacts,
    ];

    pub fn key_prefix(&self) -> &'static str {
        match self {
            DataDomain::Reminders => "reminders_",
            DataDomain::Memories => "memories_",
            DataDomain::Contacts => "contacts_",
            DataDomain::HomeLocation => "homeLocation_",
        }
    }

    pub fn storage_key(&self, email: &AccountEmail) -> String {
        format!("{}{}", self.key_prefix(), email)
    }
}

impl fmt::Display for DataDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataDomain::Reminders => "reminders",
            DataDomain::Memories => "memories",
            DataDomain::Contacts => "contacts",
            DataDomain::HomeLocation => "home_location",
        };
        write!(f, "{name}")
    }
}

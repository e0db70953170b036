use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Normalized account email: trimmed and lower-cased.
///
/// The normalized form is the sole primary key for all per-account data;
/// every store key embeds it. No numeric user id is guaranteed to exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountEmail(String);

// Deserialization funnels through `new` so data arriving from the server or
// an old store copy is normalized the same way as locally constructed keys.
impl<'de> Deserialize<'de> for AccountEmail {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        AccountEmail::new(&raw).map_err(serde::de::Error::custom)
    }
}

impl AccountEmail {
    pub fn new(value: &str) -> Result<Self, String> {
        let normalized = value.trim().to_lowercase();
        Self::validate(&normalized)?;
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the `@`, used to derive a fallback display name.
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.is_empty() {
            return Err("Account email cannot be empty".to_string());
        }
        if !value.contains('@') {
            return Err(format!("Account email '{value}' is missing an '@'"));
        }
        Ok(())
    }
}

impl fmt::Display for AccountEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AccountEmail> for String {
    fn from(email: AccountEmail) -> Self {
        email.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let email = AccountEmail::new("  P@X.COM ").unwrap();
        assert_eq!(email.as_str(), "p@x.com");
    }

    #[test]
    fn test_rejects_missing_at() {
        assert!(AccountEmail::new("not-an-email").is_err());
        assert!(AccountEmail::new("   ").is_err());
    }

    #[test]
    fn test_deserialization_normalizes() {
        let email: AccountEmail = serde_json::from_str("\" P@X.COM \"").unwrap();
        assert_eq!(email.as_str(), "p@x.com");
        assert!(serde_json::from_str::<AccountEmail>("\"no-at\"").is_err());
    }

    #[test]
    fn test_local_part() {
        let email = AccountEmail::new("jane.doe_99@x.com").unwrap();
        assert_eq!(email.local_part(), "jane.doe_99");
    }
}

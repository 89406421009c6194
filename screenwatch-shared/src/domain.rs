use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of a freshly issued family key.
pub const FAMILY_KEY_LEN: usize = 8;

/// Shared token linking one parent to its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyKey(pub String);

impl FamilyKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FamilyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FamilyKey {
    fn from(value: &str) -> Self {
        FamilyKey(value.to_string())
    }
}

impl From<String> for FamilyKey {
    fn from(value: String) -> Self {
        FamilyKey(value)
    }
}

impl FromStr for FamilyKey {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FamilyKey(s.to_string()))
    }
}

/// Application identifier -> foreground seconds for the latest reporting window.
///
/// Values are kept signed and are never sanitized on the way in.
pub type UsageSnapshot = BTreeMap<String, i64>;

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

use std::collections::BTreeMap;

use screenwatch_shared::{FamilyKey, UsageSnapshot};
use serde::{Deserialize, Serialize};

/// The whole persisted store. Collections missing from an older file are
/// backfilled empty on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub parents: BTreeMap<String, ParentRecord>,
    #[serde(default)]
    pub children: BTreeMap<String, ChildRecord>,
    /// Child email -> latest snapshot.
    #[serde(default)]
    pub usage: BTreeMap<String, UsageSnapshot>,
    /// Child email -> timestamp of the last report.
    #[serde(default)]
    pub heartbeat: BTreeMap<String, String>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
            && self.children.is_empty()
            && self.usage.is_empty()
            && self.heartbeat.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRecord {
    pub password: String,
    pub family_key: FamilyKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRecord {
    pub password: String,
    pub family_key: FamilyKey,
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{FamilyKey, UsageSnapshot};

/// Latest telemetry for one child as seen by the viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildUsage {
    pub usage: UsageSnapshot,
    /// Raw heartbeat string; `None` means the child never reported.
    pub heartbeat: Option<String>,
}

/// Child email -> latest telemetry.
pub type FamilyUsage = BTreeMap<String, ChildUsage>;

/// Identity handed from the child login flow to the background collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildIdentity {
    pub child_email: String,
    pub family_key: FamilyKey,
}

impl ChildIdentity {
    pub fn new(child_email: impl Into<String>, family_key: impl Into<FamilyKey>) -> Self {
        Self {
            child_email: child_email.into(),
            family_key: family_key.into(),
        }
    }

    /// Both fields must be non-blank for the collector to report.
    pub fn is_complete(&self) -> bool {
        !self.child_email.trim().is_empty() && !self.family_key.as_str().trim().is_empty()
    }
}

/// Copy of a report as written to the collector's optional debug dump.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReport {
    pub child_email: String,
    pub family_key: FamilyKey,
    pub timestamp: String, // RFC3339 UTC
    pub usage: UsageSnapshot,
}

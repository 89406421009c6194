use screenwatch_shared::api::{ChildUsage, FamilyUsage};
use screenwatch_shared::status::{self, Liveness};
use screenwatch_shared::{FamilyKey, UsageSnapshot};
use tracing::info;

use crate::storage::models::Document;
use crate::storage::{StorageError, Store};

/// Result of [`Store::record_usage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUsage {
    pub heartbeat: String,
    /// False when the report could not be written to disk.
    pub persisted: bool,
}

impl Store {
    /// Replace the child's snapshot and stamp its heartbeat in one
    /// transaction.
    ///
    /// Neither the email nor the durations are validated.
    pub async fn record_usage(
        &self,
        child_email: &str,
        usage: UsageSnapshot,
    ) -> Result<RecordedUsage, StorageError> {
        let email = child_email.to_string();
        let (heartbeat, persisted) = self
            .update_durable(move |doc| {
                let heartbeat = status::format_heartbeat(screenwatch_shared::domain::now_utc());
                let apps = usage.len();
                doc.usage.insert(email.clone(), usage);
                doc.heartbeat.insert(email.clone(), heartbeat.clone());
                info!(child=%email, apps, %heartbeat, "recorded usage");
                heartbeat
            })
            .await?;
        Ok(RecordedUsage {
            heartbeat,
            persisted,
        })
    }

    /// Latest usage and heartbeat of every child linked to `family_key`.
    pub async fn query_usage_for_family(
        &self,
        family_key: &FamilyKey,
    ) -> Result<FamilyUsage, StorageError> {
        let key = family_key.clone();
        self.read(move |doc| family_usage(doc, &key)).await
    }

    pub async fn child_status(&self, child_email: &str) -> Result<Liveness, StorageError> {
        let email = child_email.to_string();
        let heartbeat = self
            .read(move |doc| doc.heartbeat.get(&email).cloned())
            .await?;
        Ok(status::status_now(heartbeat.as_deref()))
    }
}

pub fn family_usage(doc: &Document, family_key: &FamilyKey) -> FamilyUsage {
    doc.children
        .iter()
        .filter(|(_, child)| &child.family_key == family_key)
        .map(|(email, _)| {
            let entry = ChildUsage {
                usage: doc.usage.get(email).cloned().unwrap_or_default(),
                heartbeat: doc.heartbeat.get(email).cloned(),
            };
            (email.clone(), entry)
        })
        .collect()
}

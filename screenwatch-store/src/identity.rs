use screenwatch_shared::FamilyKey;
use screenwatch_shared::domain::FAMILY_KEY_LEN;
use tracing::{debug, info, warn};

use crate::credential;
use crate::storage::models::{ChildRecord, Document, ParentRecord};
use crate::storage::{StorageError, Store};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Unknown email or wrong password; deliberately not told apart.
    #[error("invalid email or password")]
    AuthFailed,

    /// A returning child supplied a key other than the one it is linked to.
    #[error("family key mismatch")]
    FamilyKeyMismatch { stored: FamilyKey },

    #[error("credential error: {0}")]
    Credential(#[from] bcrypt::BcryptError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Fresh 8-character uppercase hex token taken from a v4 UUID.
pub fn generate_family_key() -> FamilyKey {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    FamilyKey(hex[..FAMILY_KEY_LEN].to_ascii_uppercase())
}

fn issue_family_key(doc: &Document) -> FamilyKey {
    loop {
        let key = generate_family_key();
        if !doc.parents.values().any(|p| p.family_key == key) {
            return key;
        }
        debug!(%key, "family key collision; drawing another");
    }
}

impl Store {
    /// Register a parent and return its family key. Replaying an existing
    /// email returns the stored key and ignores `password`.
    pub async fn register_parent(
        &self,
        email: &str,
        password: &str,
    ) -> Result<FamilyKey, IdentityError> {
        let store = self.clone();
        let email = email.to_string();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || -> Result<FamilyKey, IdentityError> {
            let existing = store.read_blocking(|doc| {
                doc.parents.get(&email).map(|p| p.family_key.clone())
            });
            if let Some(key) = existing {
                debug!(parent=%email, "parent already registered");
                return Ok(key);
            }
            let sealed = credential::seal(&password, store.hash_cost())?;
            Ok(store.update_blocking(move |doc| {
                // Re-check under the write lock; another process may have won.
                if let Some(p) = doc.parents.get(&email) {
                    return p.family_key.clone();
                }
                let family_key = issue_family_key(doc);
                doc.parents.insert(
                    email.clone(),
                    ParentRecord {
                        password: sealed,
                        family_key: family_key.clone(),
                    },
                );
                info!(parent=%email, %family_key, "registered parent");
                family_key
            }))
        })
        .await
        .map_err(StorageError::from)?
    }

    pub async fn login_parent(
        &self,
        email: &str,
        password: &str,
    ) -> Result<FamilyKey, IdentityError> {
        let owned = email.to_string();
        let record = self
            .read(move |doc| {
                doc.parents
                    .get(&owned)
                    .map(|p| (p.password.clone(), p.family_key.clone()))
            })
            .await?;
        check_login(record, email, password, self.hash_cost(), "parent").await
    }

    /// Upsert a child linked to `family_key`. The key is not checked against
    /// any registered parent.
    pub async fn register_child(
        &self,
        email: &str,
        password: &str,
        family_key: &FamilyKey,
    ) -> Result<(), IdentityError> {
        let store = self.clone();
        let email = email.to_string();
        let password = password.to_string();
        let family_key = family_key.clone();
        tokio::task::spawn_blocking(move || -> Result<(), IdentityError> {
            let sealed = credential::seal(&password, store.hash_cost())?;
            store.update_blocking(move |doc| {
                let replaced = doc.children.insert(
                    email.clone(),
                    ChildRecord {
                        password: sealed,
                        family_key: family_key.clone(),
                    },
                );
                info!(child=%email, %family_key, relinked=replaced.is_some(), "registered child");
            });
            Ok(())
        })
        .await
        .map_err(StorageError::from)?
    }

    pub async fn child_exists(&self, email: &str) -> Result<bool, StorageError> {
        let owned = email.to_string();
        self.read(move |doc| doc.children.contains_key(&owned)).await
    }

    /// Returns the family key stored for the child, not one supplied by the caller.
    pub async fn login_child(
        &self,
        email: &str,
        password: &str,
    ) -> Result<FamilyKey, IdentityError> {
        let owned = email.to_string();
        let record = self
            .read(move |doc| {
                doc.children
                    .get(&owned)
                    .map(|c| (c.password.clone(), c.family_key.clone()))
            })
            .await?;
        check_login(record, email, password, self.hash_cost(), "child").await
    }

    /// Login for a child that also typed a family key. A key other than the
    /// stored one is refused; the store is not touched either way.
    pub async fn login_returning_child(
        &self,
        email: &str,
        password: &str,
        supplied: &FamilyKey,
    ) -> Result<FamilyKey, IdentityError> {
        let stored = self.login_child(email, password).await?;
        if &stored != supplied {
            warn!(child=%email, "family key mismatch on login");
            return Err(IdentityError::FamilyKeyMismatch { stored });
        }
        Ok(stored)
    }
}

async fn check_login(
    record: Option<(String, FamilyKey)>,
    email: &str,
    password: &str,
    cost: u32,
    role: &'static str,
) -> Result<FamilyKey, IdentityError> {
    let password = password.to_string();
    let (stored, family_key) = record.unzip();
    let ok = tokio::task::spawn_blocking(move || match stored {
        Some(stored) => credential::verify(&password, &stored),
        None => credential::verify_absent(&password, cost),
    })
    .await
    .map_err(StorageError::from)?;
    match family_key {
        Some(family_key) if ok => {
            debug!(%email, role, "login ok");
            Ok(family_key)
        }
        _ => {
            warn!(%email, role, "login failed");
            Err(IdentityError::AuthFailed)
        }
    }
}

//! Login-or-register flows behind the parent and child screens.

use std::io::Write;
use std::path::Path;

use screenwatch_shared::FamilyKey;
use screenwatch_shared::api::ChildIdentity;
use screenwatch_store::{IdentityError, Store};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentSignIn {
    Registered(FamilyKey),
    Returning(FamilyKey),
}

impl ParentSignIn {
    pub fn family_key(&self) -> &FamilyKey {
        match self {
            ParentSignIn::Registered(k) | ParentSignIn::Returning(k) => k,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSignIn {
    /// New (or re-registered) child linked to the supplied key.
    Registered,
    Returning,
}

fn require(field: &'static str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Log a parent in, registering the email when it is new.
///
/// Registration is idempotent, so a wrong password for a known email falls
/// through to a second login and fails there without revealing the key.
pub async fn sign_in_parent(
    store: &Store,
    email: &str,
    password: &str,
) -> Result<ParentSignIn, AppError> {
    let email = email.trim();
    require("email", email)?;
    require("password", password)?;
    match store.login_parent(email, password).await {
        Ok(key) => Ok(ParentSignIn::Returning(key)),
        Err(IdentityError::AuthFailed) => {
            store.register_parent(email, password).await?;
            let key = store.login_parent(email, password).await?;
            Ok(ParentSignIn::Registered(key))
        }
        Err(e) => Err(e.into()),
    }
}

/// Log a child in with the family key it was given, registering it when the
/// email is new. A known email with a wrong password, or a returning child
/// whose stored key differs, is refused and nothing is written. On success
/// the identity is handed to the collector.
pub async fn sign_in_child(
    store: &Store,
    identity_path: &Path,
    email: &str,
    password: &str,
    family_key: &FamilyKey,
) -> Result<ChildSignIn, AppError> {
    let email = email.trim();
    let family_key = FamilyKey::from(family_key.as_str().trim());
    require("email", email)?;
    require("password", password)?;
    require("family key", family_key.as_str())?;

    let outcome = match store
        .login_returning_child(email, password, &family_key)
        .await
    {
        Ok(_) => ChildSignIn::Returning,
        Err(IdentityError::AuthFailed) => {
            if store.child_exists(email).await? {
                return Err(IdentityError::AuthFailed.into());
            }
            store.register_child(email, password, &family_key).await?;
            ChildSignIn::Registered
        }
        Err(e) => return Err(e.into()),
    };

    let identity = ChildIdentity::new(email, family_key);
    if let Err(e) = write_identity(identity_path, &identity) {
        warn!(path=%identity_path.display(), error=%e, "failed to write child identity");
    } else {
        info!(path=%identity_path.display(), child=%email, "child identity saved for collector");
    }
    Ok(outcome)
}

/// Atomically replace the identity file the collector reads.
pub fn write_identity(path: &Path, identity: &ChildIdentity) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut tmp, identity).map_err(std::io::Error::other)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path).map_err(|e| AppError::Io(e.error))?;
    Ok(())
}

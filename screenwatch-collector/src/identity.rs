use std::io::ErrorKind;
use std::path::Path;

use screenwatch_shared::api::ChildIdentity;

use crate::AppError;

/// Read the identity left by the child login flow. Absent, malformed or
/// incomplete files all mean no identity is configured yet.
pub fn load_identity(path: &Path) -> Result<ChildIdentity, AppError> {
    let not_configured = |reason: String| AppError::NoIdentityConfigured {
        path: path.display().to_string(),
        reason,
    };
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(not_configured("file not found".into()));
        }
        Err(e) => return Err(not_configured(format!("read failed: {e}"))),
    };
    let identity: ChildIdentity = serde_json::from_str(&data)
        .map_err(|e| not_configured(format!("parse failed: {e}")))?;
    if !identity.is_complete() {
        return Err(not_configured("child_email or family_key is empty".into()));
    }
    Ok(identity)
}

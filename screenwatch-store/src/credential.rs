use sha2::{Digest, Sha256};

/// Hash a password for storage.
///
/// The password is digested first so bcrypt never sees more than 64 bytes and
/// long passwords still compare in full.
pub(crate) fn seal(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(digest(password), cost)
}

/// Check a password against a stored credential. Records that are not bcrypt
/// hashes are compared as-is.
pub(crate) fn verify(password: &str, stored: &str) -> bool {
    match bcrypt::verify(digest(password), stored) {
        Ok(ok) => ok,
        Err(_) => stored == password,
    }
}

/// Spend the same bcrypt work as [`verify`] when there is no stored record,
/// so an unknown email takes as long to reject as a wrong password.
pub(crate) fn verify_absent(password: &str, cost: u32) -> bool {
    let _ = seal(password, cost);
    false
}

fn digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::db::Database;
use crate::error::{LedgerError, Result};
use crate::validate::{validate_password, validate_username};

/// Hex-encoded SHA-256 of the password, the form stored in `users.password_hash`.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Validate credentials and create the account. Returns the new user id.
pub fn register(db: &Database, username: &str, password: &str) -> Result<i64> {
    let username = username.trim();
    validate_username(username)?;
    validate_password(password)?;
    db.create_user(username, &hash_password(password))
}

/// Resolve a username/password pair to a user id.
pub fn login(db: &Database, username: &str, password: &str) -> Result<i64> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(LedgerError::validation("Username and password are required"));
    }
    validate_username(username)?;
    match db.find_user_by_credentials(username, &hash_password(password))? {
        Some(id) => Ok(id),
        None => {
            warn!(username, "login failed");
            Err(LedgerError::not_found("user", username))
        }
    }
}

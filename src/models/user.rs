#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Hex-encoded SHA-256 of the password; never the password itself.
    pub password_hash: String,
}

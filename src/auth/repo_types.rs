use std::fmt;

use sqlx::FromRow;

/// User record in the database.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: i64,       // unique user ID
    pub email: String, // user email
    #[sqlx(rename = "pass_hash")]
    pub password_hash: String, // Argon2 PHC string, never logged
    pub is_admin: bool,        // set at creation only
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

/// Failures reported by a [`UserStore`](super::repo::UserStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,

    #[error("user already exists")]
    AlreadyExists,

    #[error("storage failure: {0:#}")]
    Storage(#[source] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::AlreadyExists,
            other => StoreError::Storage(other.into()),
        }
    }
}

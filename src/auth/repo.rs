use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::info;

use crate::auth::repo_types::{StoreError, User};

/// Persistent user records, keyed by email.
///
/// Implementations must be safe to call from many request handlers at once.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a non-admin user and returns its new id.
    async fn save_user(&self, email: &str, password_hash: &str) -> Result<i64, StoreError>;

    async fn user_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn is_admin(&self, user_id: i64) -> Result<bool, StoreError>;
}

/// SQLite-backed store. Concurrency is delegated to the pool.
#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    /// Opens (creating if missing) the database at `path` and runs migrations.
    pub async fn connect(path: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(path)
            .with_context(|| format!("invalid storage path {path:?}"))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("open sqlite database")?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        info!(path, "storage ready");
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")
    }

    /// Inserts a user with an explicit admin flag.
    pub async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (email, pass_hash, is_admin)
            VALUES (?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn save_user(&self, email: &str, password_hash: &str) -> Result<i64, StoreError> {
        self.insert_user(email, password_hash, false).await
    }

    async fn user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, pass_hash, is_admin
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        user.ok_or(StoreError::NotFound)
    }

    async fn is_admin(&self, user_id: i64) -> Result<bool, StoreError> {
        let flag = sqlx::query_scalar::<_, bool>("SELECT is_admin FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        flag.ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteUserStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        let store = SqliteUserStore::from_pool(pool);
        store.migrate().await.expect("migrations");
        store
    }

    #[tokio::test]
    async fn save_then_fetch_by_email() {
        let store = memory_store().await;
        let id = store.save_user("a@x.com", "$argon2id$stub").await.unwrap();
        assert_eq!(id, 1);

        let user = store.user_by_email("a@x.com").await.unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.password_hash, "$argon2id$stub");
        assert!(!user.is_admin);
    }

    #[tokio::test]
    async fn duplicate_email_is_already_exists() {
        let store = memory_store().await;
        store.save_user("a@x.com", "h1").await.unwrap();
        let err = store.save_user("a@x.com", "h2").await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = memory_store().await;
        assert!(matches!(
            store.user_by_email("nobody@x.com").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(store.is_admin(42).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn admin_flag_is_persisted() {
        let store = memory_store().await;
        let plain = store.save_user("user@x.com", "h").await.unwrap();
        let admin = store.insert_user("root@x.com", "h", true).await.unwrap();
        assert!(!store.is_admin(plain).await.unwrap());
        assert!(store.is_admin(admin).await.unwrap());
    }

    #[test]
    fn debug_never_prints_hash() {
        let user = User {
            id: 1,
            email: "a@x.com".into(),
            password_hash: "$argon2id$secret".into(),
            is_admin: false,
        };
        assert!(!format!("{user:?}").contains("argon2id"));
    }
}

//! Common test utilities shared across integration tests.
#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use passgate::{
    auth::{
        jwt::IssueError, AuthService, JwtKeys, PasswordHashing, StoreError, TokenIssuer, User,
        UserStore,
    },
    config::{HashConfig, ServerConfig},
    grpc::AuthGrpc,
};

pub const SECRET: &str = "integration-secret";
pub const ISSUER: &str = "passgate-test";

/// In-memory store that counts every call and can be slowed down.
#[derive(Default)]
pub struct CountingStore {
    users: Mutex<Vec<User>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn insert_admin(&self, email: &str) -> i64 {
        let mut users = self.users.lock().unwrap();
        let id = users.len() as i64 + 1;
        users.push(User {
            id,
            email: email.into(),
            password_hash: "unused".into(),
            is_admin: true,
        });
        id
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl UserStore for CountingStore {
    async fn save_user(&self, email: &str, password_hash: &str) -> Result<i64, StoreError> {
        self.enter().await;
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == email) {
            return Err(StoreError::AlreadyExists);
        }
        let id = users.len() as i64 + 1;
        users.push(User {
            id,
            email: email.into(),
            password_hash: password_hash.into(),
            is_admin: false,
        });
        Ok(id)
    }

    async fn user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.enter().await;
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn is_admin(&self, user_id: i64) -> Result<bool, StoreError> {
        self.enter().await;
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.is_admin)
            .ok_or(StoreError::NotFound)
    }
}

/// Store whose every call fails with a backend error.
pub struct BrokenStore;

#[async_trait]
impl UserStore for BrokenStore {
    async fn save_user(&self, _email: &str, _hash: &str) -> Result<i64, StoreError> {
        Err(StoreError::Storage(anyhow::anyhow!("database is locked")))
    }

    async fn user_by_email(&self, _email: &str) -> Result<User, StoreError> {
        Err(StoreError::Storage(anyhow::anyhow!("database is locked")))
    }

    async fn is_admin(&self, _user_id: i64) -> Result<bool, StoreError> {
        Err(StoreError::Storage(anyhow::anyhow!("database is locked")))
    }
}

/// Issuer whose signer always fails.
pub struct FailingIssuer;

#[async_trait]
impl TokenIssuer for FailingIssuer {
    async fn issue_token(&self, _user: &User, _ttl: Duration) -> Result<String, IssueError> {
        Err(IssueError::Signing(
            jsonwebtoken::errors::ErrorKind::InvalidKeyFormat.into(),
        ))
    }
}

pub fn keys() -> JwtKeys {
    JwtKeys::new(SECRET, ISSUER)
}

pub fn cheap_hashing() -> PasswordHashing {
    PasswordHashing::new(&HashConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid argon2 params")
}

pub fn service(store: Arc<dyn UserStore>) -> AuthService {
    service_with_issuer(store, Arc::new(keys()))
}

pub fn service_with_issuer(
    store: Arc<dyn UserStore>,
    issuer: Arc<dyn TokenIssuer>,
) -> AuthService {
    AuthService::new(store, issuer, cheap_hashing(), Duration::from_secs(900))
}

pub fn adapter(store: Arc<dyn UserStore>) -> AuthGrpc {
    AuthGrpc::new(Arc::new(service(store)))
}

/// Loopback config with OS-assigned ports.
pub fn loopback_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        grpc_port: 0,
        gateway_port: 0,
        drain_timeout_secs: 5,
        request_timeout_secs: 5,
    }
}

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("passgate=debug"))
        .try_init();
}

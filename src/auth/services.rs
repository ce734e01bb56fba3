use std::{sync::Arc, time::Duration};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    error::AuthError,
    jwt::TokenIssuer,
    password::PasswordHashing,
    repo::UserStore,
    repo_types::StoreError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Credential checks and token issuance.
///
/// Knows nothing about transports: every failure is an [`AuthError`].
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    issuer: Arc<dyn TokenIssuer>,
    hashing: PasswordHashing,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        issuer: Arc<dyn TokenIssuer>,
        hashing: PasswordHashing,
        token_ttl: Duration,
    ) -> Self {
        Self {
            store,
            issuer,
            hashing,
            token_ttl,
        }
    }

    /// Checks `password` for `email` and returns a freshly signed token.
    ///
    /// Unknown email and wrong password both yield
    /// [`AuthError::InvalidCredentials`].
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let user = match self.store.user_by_email(email).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                warn!("login unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, "failed to get user");
                return Err(AuthError::Internal(e.into()));
            }
        };

        let ok = self
            .hashing
            .verify_password(password, &user.password_hash)
            .map_err(|e| {
                error!(error = %e, user_id = user.id, "verify_password failed");
                AuthError::Internal(e)
            })?;
        if !ok {
            warn!(user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .issuer
            .issue_token(&user, self.token_ttl)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = user.id, "failed to generate token");
                AuthError::Internal(e.into())
            })?;

        info!(user_id = user.id, "user logged in");
        Ok(token)
    }

    /// Hashes `password` and stores a new non-admin user.
    ///
    /// A taken email yields [`AuthError::InvalidCredentials`].
    #[instrument(skip(self, password))]
    pub async fn register_new_user(&self, email: &str, password: &str) -> Result<i64, AuthError> {
        let hash = self.hashing.hash_password(password).map_err(|e| {
            error!(error = %e, "failed to generate password hash");
            AuthError::Internal(e)
        })?;

        let id = match self.store.save_user(email, &hash).await {
            Ok(id) => id,
            Err(StoreError::AlreadyExists) => {
                warn!("email already registered");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, "failed to save user");
                return Err(AuthError::Internal(e.into()));
            }
        };

        info!(user_id = id, "user registered");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub async fn is_admin(&self, user_id: i64) -> Result<bool, AuthError> {
        match self.store.is_admin(user_id).await {
            Ok(flag) => Ok(flag),
            Err(StoreError::NotFound) => {
                warn!("admin check for unknown user");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                error!(error = %e, "failed to get permission");
                Err(AuthError::Internal(e.into()))
            }
        }
    }
}

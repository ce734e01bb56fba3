use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::{claims::Claims, repo_types::User};
use crate::config::TokenConfig;

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("token ttl {0:?} is out of range")]
    Ttl(Duration),

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Mints signed bearer tokens for authenticated principals.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, user: &User, ttl: Duration) -> Result<String, IssueError>;
}

/// HS256 signing and verification keys.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
}

impl JwtKeys {
    pub fn new(secret: &str, issuer: impl Into<String>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.into(),
        }
    }

    pub fn from_config(cfg: &TokenConfig) -> Self {
        Self::new(&cfg.secret, cfg.issuer.clone())
    }

    pub fn sign(&self, user: &User, ttl: Duration) -> Result<String, IssueError> {
        let now = OffsetDateTime::now_utc();
        let ttl_secs = i64::try_from(ttl.as_secs()).map_err(|_| IssueError::Ttl(ttl))?;
        let exp = now
            .checked_add(TimeDuration::seconds(ttl_secs))
            .ok_or(IssueError::Ttl(ttl))?;
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = user.id, jti = %claims.jti, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[async_trait]
impl TokenIssuer for JwtKeys {
    async fn issue_token(&self, user: &User, ttl: Duration) -> Result<String, IssueError> {
        self.sign(user, ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, email: &str) -> User {
        User {
            id,
            email: email.into(),
            password_hash: String::new(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn issued_token_carries_identity() {
        let keys = JwtKeys::new("dev-secret", "test-issuer");
        let token = keys
            .issue_token(&user(7, "a@x.com"), Duration::from_secs(300))
            .await
            .expect("issue token");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn tokens_get_unique_ids() {
        let keys = JwtKeys::new("dev-secret", "iss");
        let u = user(1, "a@x.com");
        let a = keys.verify(&keys.sign(&u, Duration::from_secs(60)).unwrap()).unwrap();
        let b = keys.verify(&keys.sign(&u, Duration::from_secs(60)).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let good = JwtKeys::new("secret-a", "iss");
        let bad = JwtKeys::new("secret-b", "iss");
        let token = good.sign(&user(1, "a@x.com"), Duration::from_secs(60)).unwrap();
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_wrong_issuer() {
        let good = JwtKeys::new("same-secret", "good-iss");
        let bad = JwtKeys::new("same-secret", "bad-iss");
        let token = good.sign(&user(1, "a@x.com"), Duration::from_secs(60)).unwrap();
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = JwtKeys::new("dev-secret", "iss");
        let mut claims = keys
            .verify(&keys.sign(&user(1, "a@x.com"), Duration::from_secs(60)).unwrap())
            .unwrap();
        claims.exp = claims.iat - 3600;
        claims.iat -= 7200;
        let stale = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(keys.verify(&stale).is_err());
    }

    #[test]
    fn sign_rejects_absurd_ttl() {
        let keys = JwtKeys::new("dev-secret", "iss");
        let err = keys
            .sign(&user(1, "a@x.com"), Duration::from_secs(u64::MAX))
            .unwrap_err();
        assert!(matches!(err, IssueError::Ttl(_)));
    }
}

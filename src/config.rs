use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;
use serde::Deserialize;

/// Deployment flavour, selects the log format and default verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    Local,
    Dev,
    Prod,
}

impl FromStr for Env {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Env::Local),
            "dev" => Ok(Env::Dev),
            "prod" => Ok(Env::Prod),
            other => anyhow::bail!("unknown APP_ENV {other:?} (expected local, dev or prod)"),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
}

impl TokenConfig {
    /// Token lifetime. Zero, negative and overflowing values are rejected.
    pub fn ttl(&self) -> anyhow::Result<Duration> {
        if self.ttl_minutes <= 0 {
            anyhow::bail!("TOKEN_TTL_MINUTES must be positive, got {}", self.ttl_minutes);
        }
        let secs = u64::try_from(self.ttl_minutes)
            .ok()
            .and_then(|m| m.checked_mul(60))
            .with_context(|| format!("TOKEN_TTL_MINUTES {} is too large", self.ttl_minutes))?;
        Ok(Duration::from_secs(secs))
    }
}

// Keeps the signing secret out of startup logs.
impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub grpc_port: u16,
    pub gateway_port: u16,
    pub drain_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn grpc_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.grpc_port)
            .parse()
            .with_context(|| format!("invalid gRPC address {}:{}", self.host, self.grpc_port))
    }

    pub fn gateway_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.gateway_port)
            .parse()
            .with_context(|| format!("invalid gateway address {}:{}", self.host, self.gateway_port))
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: Env,
    pub storage_path: String,
    pub server: ServerConfig,
    pub token: TokenConfig,
    pub hash: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let env = std::env::var("APP_ENV")
            .unwrap_or_else(|_| "local".into())
            .parse::<Env>()?;
        let storage_path = std::env::var("STORAGE_PATH").context("STORAGE_PATH is required")?;

        let server = ServerConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            grpc_port: parse_or("GRPC_PORT", 44044)?,
            gateway_port: parse_or("GATEWAY_PORT", 8081)?,
            drain_timeout_secs: parse_or("DRAIN_TIMEOUT_SECS", 10)?,
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 30)?,
        };

        let token = TokenConfig {
            secret: std::env::var("TOKEN_SECRET").context("TOKEN_SECRET is required")?,
            issuer: std::env::var("TOKEN_ISSUER").unwrap_or_else(|_| "passgate".into()),
            ttl_minutes: parse_or("TOKEN_TTL_MINUTES", 60)?,
        };
        if token.secret.is_empty() {
            anyhow::bail!("TOKEN_SECRET must not be empty");
        }
        token.ttl()?;

        let defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: parse_or("HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or("HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or("HASH_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Self {
            env,
            storage_path,
            server,
            token,
            hash,
        })
    }
}

/// Reads `key` and parses it, falling back to `default` when unset.
fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value {raw:?}")),
        Err(_) => Ok(default),
    }
}

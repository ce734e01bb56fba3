pub mod claims;
pub mod error;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use error::AuthError;
pub use jwt::{JwtKeys, TokenIssuer};
pub use password::PasswordHashing;
pub use repo::{SqliteUserStore, UserStore};
pub use repo_types::{StoreError, User};
pub use services::AuthService;

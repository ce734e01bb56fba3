/// Errors raised by [`AuthService`](super::services::AuthService).
///
/// The transport layer maps every variant; keep the set closed.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown user, wrong password or duplicate registration.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("internal error: {0:#}")]
    Internal(#[source] anyhow::Error),
}

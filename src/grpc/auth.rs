use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::debug;

use crate::auth::{services::is_valid_email, AuthError, AuthService};
use crate::grpc::proto::{
    auth_server::{Auth, AuthServer},
    IsAdminRequest, IsAdminResponse, LoginRequest, LoginResponse, RegisterRequest,
    RegisterResponse,
};

/// Translates `auth.v1.Auth` calls into [`AuthService`] calls.
///
/// Stateless per request; clones share the same service.
#[derive(Clone)]
pub struct AuthGrpc {
    auth: Arc<AuthService>,
}

impl AuthGrpc {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }

    pub fn into_server(self) -> AuthServer<Self> {
        AuthServer::new(self)
    }
}

/// Normalised (email, password) pair that passed structural checks.
struct Credentials {
    email: String,
    password: String,
}

#[allow(clippy::result_large_err)]
fn validate_credentials(email: &str, password: String) -> Result<Credentials, Status> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(Status::invalid_argument("email is required"));
    }
    if !is_valid_email(&email) {
        return Err(Status::invalid_argument("email is not valid"));
    }
    if password.is_empty() {
        return Err(Status::invalid_argument("password is required"));
    }
    Ok(Credentials { email, password })
}

/// Maps a domain error to a wire status. `InvalidCredentials` gets the
/// operation's own client message; everything else is an opaque internal.
fn to_status(err: AuthError, invalid_msg: &'static str, internal_msg: &'static str) -> Status {
    match err {
        AuthError::InvalidCredentials => Status::invalid_argument(invalid_msg),
        AuthError::Internal(_) => Status::internal(internal_msg),
    }
}

#[tonic::async_trait]
impl Auth for AuthGrpc {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();
        let creds = validate_credentials(&req.email, req.password)?;

        let user_id = self
            .auth
            .register_new_user(&creds.email, &creds.password)
            .await
            .map_err(|e| to_status(e, "user already exists", "failed to register"))?;

        Ok(Response::new(RegisterResponse { user_id }))
    }

    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();
        let creds = validate_credentials(&req.email, req.password)?;

        let token = self
            .auth
            .login(&creds.email, &creds.password)
            .await
            .map_err(|e| to_status(e, "invalid email or password", "failed to login"))?;

        Ok(Response::new(LoginResponse { token }))
    }

    async fn is_admin(
        &self,
        request: Request<IsAdminRequest>,
    ) -> Result<Response<IsAdminResponse>, Status> {
        let req = request.into_inner();
        if req.user_id == 0 {
            debug!("is_admin without user_id");
            return Err(Status::invalid_argument("user_id is required"));
        }

        let is_admin = self
            .auth
            .is_admin(req.user_id)
            .await
            .map_err(|e| to_status(e, "user not found", "failed to check admin status"))?;

        Ok(Response::new(IsAdminResponse { is_admin }))
    }
}

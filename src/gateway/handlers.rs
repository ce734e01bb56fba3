use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tonic::{Code, Request, Status};
use tracing::{instrument, warn};

use crate::gateway::dto::{CredentialsBody, ErrorBody, IsAdminBody, TokenBody, UserIdBody};
use crate::grpc::{
    proto::{auth_server::Auth, IsAdminRequest, LoginRequest, RegisterRequest},
    AuthGrpc,
};

pub fn auth_routes() -> Router<AuthGrpc> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/users/:user_id/admin", get(is_admin))
}

/// A gRPC status rendered as an HTTP error.
pub struct GatewayError(Status);

impl From<Status> for GatewayError {
    fn from(status: Status) -> Self {
        Self(status)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.0.code() as i32,
            message: self.0.message().to_string(),
        };
        (http_status(self.0.code()), Json(body)).into_response()
    }
}

/// gRPC code to HTTP status, following the grpc-gateway convention.
pub fn http_status(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => {
            StatusCode::BAD_REQUEST
        }
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::Unknown | Code::Internal | Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn bad_body(rejection: JsonRejection) -> GatewayError {
    warn!(error = %rejection, "malformed gateway body");
    GatewayError(Status::invalid_argument("malformed request body"))
}

#[instrument(skip_all)]
pub async fn register(
    State(grpc): State<AuthGrpc>,
    payload: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Json<UserIdBody>, GatewayError> {
    let Json(body) = payload.map_err(bad_body)?;
    let res = grpc
        .register(Request::new(RegisterRequest {
            email: body.email,
            password: body.password,
        }))
        .await?;
    Ok(Json(UserIdBody {
        user_id: res.into_inner().user_id,
    }))
}

#[instrument(skip_all)]
pub async fn login(
    State(grpc): State<AuthGrpc>,
    payload: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Json<TokenBody>, GatewayError> {
    let Json(body) = payload.map_err(bad_body)?;
    let res = grpc
        .login(Request::new(LoginRequest {
            email: body.email,
            password: body.password,
        }))
        .await?;
    Ok(Json(TokenBody {
        token: res.into_inner().token,
    }))
}

#[instrument(skip_all)]
pub async fn is_admin(
    State(grpc): State<AuthGrpc>,
    Path(user_id): Path<String>,
) -> Result<Json<IsAdminBody>, GatewayError> {
    let user_id = user_id
        .parse::<i64>()
        .map_err(|_| GatewayError(Status::invalid_argument("user_id is not a number")))?;
    let res = grpc
        .is_admin(Request::new(IsAdminRequest { user_id }))
        .await?;
    Ok(Json(IsAdminBody {
        is_admin: res.into_inner().is_admin,
    }))
}

//! gRPC surface of the credential service.

pub mod auth;

pub mod proto {
    tonic::include_proto!("auth.v1");
}

pub use auth::AuthGrpc;

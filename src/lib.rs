//! Credential service: user registration, password login with signed bearer
//! tokens, and admin-flag lookups, served over gRPC and an HTTP/JSON gateway.

pub mod app;
pub mod auth;
pub mod config;
pub mod gateway;
pub mod grpc;
pub mod logging;

//! HTTP/JSON gateway in front of the gRPC adapter.

use std::time::Duration;

use axum::{error_handling::HandleErrorLayer, BoxError, Router};
use tonic::Status;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::grpc::AuthGrpc;
use handlers::GatewayError;

pub mod dto;
pub mod handlers;

pub fn build_router(grpc: AuthGrpc, request_timeout: Duration) -> Router {
    Router::new()
        .merge(handlers::auth_routes())
        .with_state(grpc)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

/// Renders middleware failures in the same envelope as handler errors.
async fn handle_middleware_error(err: BoxError) -> GatewayError {
    if err.is::<Elapsed>() {
        tracing::warn!("gateway request timed out");
        Status::deadline_exceeded("request timed out").into()
    } else {
        tracing::error!(error = %err, "gateway middleware failed");
        Status::internal("internal error").into()
    }
}

//! Server host: runs the gRPC listener and the HTTP gateway side by side.
//!
//! Lifecycle is encoded in the types. A [`ServerHost`] is configured but not
//! bound; [`ServerHost::start`] spawns both listener tasks and returns a
//! [`RunningHost`]; [`RunningHost::stop`] consumes it once both tasks have
//! drained or been aborted.

use std::{future::Future, net::SocketAddr, time::Duration};

use anyhow::Context;
use tokio::{
    net::TcpListener,
    sync::{oneshot, watch},
    task::JoinHandle,
    time::Instant,
};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::{error, info, warn};

use crate::{config::ServerConfig, gateway, grpc::AuthGrpc};

pub struct ServerHost {
    grpc_addr: SocketAddr,
    gateway_addr: SocketAddr,
    grpc: AuthGrpc,
    drain_timeout: Duration,
    request_timeout: Duration,
}

impl ServerHost {
    pub fn new(cfg: &ServerConfig, grpc: AuthGrpc) -> anyhow::Result<Self> {
        Ok(Self {
            grpc_addr: cfg.grpc_addr()?,
            gateway_addr: cfg.gateway_addr()?,
            grpc,
            drain_timeout: cfg.drain_timeout(),
            request_timeout: cfg.request_timeout(),
        })
    }

    /// Spawns both listeners. Each binds its own socket inside its task; a
    /// failure in one is logged and leaves the other running.
    pub fn start(self) -> RunningHost {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (grpc_ready, grpc_bound) = oneshot::channel();
        let (gateway_ready, gateway_bound) = oneshot::channel();

        let grpc_task = tokio::spawn(supervise(
            "grpc",
            serve_grpc(
                self.grpc_addr,
                self.grpc.clone(),
                self.request_timeout,
                shutdown_rx.clone(),
                grpc_ready,
            ),
        ));

        let router = gateway::build_router(self.grpc, self.request_timeout);
        let gateway_task = tokio::spawn(supervise(
            "gateway",
            serve_gateway(self.gateway_addr, router, shutdown_rx, gateway_ready),
        ));

        RunningHost {
            grpc_task,
            gateway_task,
            grpc_bound: Bound::Pending(grpc_bound),
            gateway_bound: Bound::Pending(gateway_bound),
            shutdown: shutdown_tx,
            drain_timeout: self.drain_timeout,
        }
    }
}

enum Bound {
    Pending(oneshot::Receiver<SocketAddr>),
    Resolved(Option<SocketAddr>),
}

impl Bound {
    async fn resolve(&mut self) -> Option<SocketAddr> {
        if let Bound::Pending(rx) = self {
            // The sender is dropped without a value when binding fails.
            let addr = rx.await.ok();
            *self = Bound::Resolved(addr);
        }
        match self {
            Bound::Resolved(addr) => *addr,
            Bound::Pending(_) => None,
        }
    }
}

pub struct RunningHost {
    grpc_task: JoinHandle<()>,
    gateway_task: JoinHandle<()>,
    grpc_bound: Bound,
    gateway_bound: Bound,
    shutdown: watch::Sender<bool>,
    drain_timeout: Duration,
}

impl RunningHost {
    /// Address the gRPC listener bound to, or `None` if it failed to bind.
    pub async fn grpc_addr(&mut self) -> Option<SocketAddr> {
        self.grpc_bound.resolve().await
    }

    /// Address the gateway bound to, or `None` if it failed to bind.
    pub async fn gateway_addr(&mut self) -> Option<SocketAddr> {
        self.gateway_bound.resolve().await
    }

    /// Blocks until `signal` resolves, then stops.
    pub async fn run_until<F>(self, signal: F)
    where
        F: Future<Output = ()>,
    {
        signal.await;
        self.stop().await;
    }

    /// Stops accepting on both listeners and waits, bounded by the drain
    /// timeout, for in-flight requests. Tasks still running past the
    /// deadline are aborted.
    pub async fn stop(self) {
        info!(drain_timeout = ?self.drain_timeout, "stopping servers");
        self.shutdown.send_replace(true);

        let deadline = Instant::now() + self.drain_timeout;
        tokio::join!(
            join_until("grpc", self.grpc_task, deadline),
            join_until("gateway", self.gateway_task, deadline),
        );
        info!("servers stopped");
    }
}

async fn supervise<F>(name: &'static str, listener: F)
where
    F: Future<Output = anyhow::Result<()>>,
{
    if let Err(e) = listener.await {
        let cause = format!("{e:#}");
        error!(listener = name, error = %cause, "listener failed");
    }
}

async fn join_until(name: &'static str, mut task: JoinHandle<()>, deadline: Instant) {
    match tokio::time::timeout_at(deadline, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(listener = name, error = %e, "listener task panicked"),
        Err(_) => {
            warn!(listener = name, "drain timeout elapsed, aborting");
            task.abort();
        }
    }
}

async fn stop_requested(mut shutdown: watch::Receiver<bool>) {
    // A dropped sender also means stop.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn serve_grpc(
    addr: SocketAddr,
    grpc: AuthGrpc,
    request_timeout: Duration,
    shutdown: watch::Receiver<bool>,
    ready: oneshot::Sender<SocketAddr>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind grpc listener on {addr}"))?;
    let local = listener.local_addr()?;
    info!(addr = %local, "grpc server started");
    let _ = ready.send(local);

    Server::builder()
        .timeout(request_timeout)
        .trace_fn(|req| tracing::info_span!("grpc_request", path = %req.uri().path()))
        .add_service(grpc.into_server())
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            stop_requested(shutdown).await;
            info!("grpc server draining");
        })
        .await
        .context("grpc server")?;

    info!("grpc server stopped");
    Ok(())
}

async fn serve_gateway(
    addr: SocketAddr,
    router: axum::Router,
    shutdown: watch::Receiver<bool>,
    ready: oneshot::Sender<SocketAddr>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind gateway listener on {addr}"))?;
    let local = listener.local_addr()?;
    info!(addr = %local, "gateway server started");
    let _ = ready.send(local);

    axum::serve(listener, router)
        .with_graceful_shutdown(stop_requested(shutdown))
        .await
        .context("gateway server")?;

    info!("gateway server stopped");
    Ok(())
}

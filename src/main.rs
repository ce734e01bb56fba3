use std::sync::Arc;

use tokio::signal;

use passgate::{
    app::ServerHost,
    auth::{AuthService, JwtKeys, PasswordHashing, SqliteUserStore},
    config::AppConfig,
    grpc::AuthGrpc,
    logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    logging::init(config.env);
    tracing::info!(config = ?config, "config loaded");

    let store = SqliteUserStore::connect(&config.storage_path).await?;
    let auth = AuthService::new(
        Arc::new(store.clone()),
        Arc::new(JwtKeys::from_config(&config.token)),
        PasswordHashing::new(&config.hash)?,
        config.token.ttl()?,
    );

    let host = ServerHost::new(&config.server, AuthGrpc::new(Arc::new(auth)))?;
    host.start().run_until(shutdown_signal()).await;

    store.close().await;
    tracing::info!("application stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "stopping application"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "stopping application"),
    }
}

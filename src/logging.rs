use crate::config::Env;

/// Installs the global subscriber. `RUST_LOG` wins over the per-env default.
pub fn init(env: Env) {
    let default_filter = match env {
        Env::Local | Env::Dev => "passgate=debug,tower_http=info,tonic=info",
        Env::Prod => "passgate=info,tower_http=info,tonic=warn",
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());

    match env {
        Env::Local => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
        Env::Dev | Env::Prod => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init(),
    }
}

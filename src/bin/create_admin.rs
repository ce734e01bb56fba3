//! Creates an admin user directly in the store. There is no API path for
//! granting admin rights, so this is the only way to get one.

use std::process::ExitCode;

use clap::Parser;

use passgate::{
    auth::{PasswordHashing, SqliteUserStore, StoreError},
    config::HashConfig,
};

#[derive(Parser, Debug)]
#[command(name = "create-admin")]
#[command(about = "Create a user with the admin flag set", long_about = None)]
struct Args {
    /// Email of the new admin
    #[arg(long)]
    email: String,

    /// Password of the new admin
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,

    /// Path to the SQLite database
    #[arg(long, env = "STORAGE_PATH")]
    storage_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()))
        .init();

    let args = Args::parse();
    let email = args.email.trim().to_lowercase();
    if email.is_empty() || args.password.is_empty() {
        eprintln!("email and password must not be empty");
        return Ok(ExitCode::FAILURE);
    }

    let hashing = PasswordHashing::new(&HashConfig::default())?;
    let hash = hashing.hash_password(&args.password)?;

    let store = SqliteUserStore::connect(&args.storage_path).await?;
    let result = store.insert_user(&email, &hash, true).await;
    store.close().await;

    match result {
        Ok(id) => {
            println!("created admin {email} with id {id}");
            Ok(ExitCode::SUCCESS)
        }
        Err(StoreError::AlreadyExists) => {
            eprintln!("email {email} is already taken");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(anyhow::Error::new(e).context("failed to save admin")),
    }
}

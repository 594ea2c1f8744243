//! Main entry point for the restgate backend.
//!
//! Initializes logging, loads configuration, builds the session token service
//! over the credential store, and serves the router.

use std::process::ExitCode;
use std::sync::Arc;

use adapters::{CredentialStore, MemoryCredentialStore};
use restgate::auth::{PasswordHasher, StoreAuthenticator};
use restgate::config::AppConfig;
use restgate::state::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restgate=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("fatal: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    tracing::info!("starting with {:?}", config);

    let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
    let tokens = config
        .session_builder()
        .authenticator(StoreAuthenticator::new(store.clone()))
        .build()?;

    let state = AppState::new(
        Arc::new(tokens),
        store,
        PasswordHasher::new(config.password_scheme),
    );
    let app = restgate::create_router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

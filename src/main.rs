//! RustPress Identity server.
//!
//! Loads configuration from the environment, migrates the database and serves
//! the identity routes until interrupted.

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use rustpress_identity::{build_state, create_routes, IdentityConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("rustpress_identity=info".parse()?),
        )
        .with_target(false)
        .init();

    let config = IdentityConfig::from_env();
    config.validate()?;

    let state = build_state(&config).await?;
    let app = create_routes(state);

    tracing::info!("Starting server on {}", config.bind_address);
    let listener = TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

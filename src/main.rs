use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rag_store::{build_router, utils, AppState, Config, Store};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting RAG Store v{}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = %config.port,
        database = %config.database_url,
        "Configuration loaded"
    );

    // Open the database and run migrations
    let pool = rag_store::store::connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to open database: {e}");
            exitcode::UNAVAILABLE
        })?;
    info!("Database ready");

    // Build application state and router
    let state = AppState::new(Store::new(pool), config.clone());
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET    /actuator/health                        - Health check");
    info!("  POST   /api/v1/sessions                        - Create session");
    info!("  GET    /api/v1/sessions?userId=                - List sessions");
    info!("  GET    /api/v1/sessions/{{id}}                   - Get session");
    info!("  PATCH  /api/v1/sessions/{{id}}                   - Rename session");
    info!("  PATCH  /api/v1/sessions/{{id}}/favorite          - Toggle favorite");
    info!("  DELETE /api/v1/sessions/{{id}}                   - Delete session");
    info!("  POST   /api/v1/sessions/{{id}}/messages          - Add message");
    info!("  GET    /api/v1/sessions/{{id}}/messages          - List messages");

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(utils::shutdown_signal())
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    info!("Server shutdown complete");
    Ok(())
}

use std::net::SocketAddr;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use user_file_server::{AppState, BlobStore, Config, open_database, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_file_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting User File Server...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );
    tracing::info!("Data directory: {:?}", config.data_dir);

    // Open storage once for the lifetime of the process
    let db = open_database(&config.database_path)?;
    let blobs = BlobStore::open(&config.upload_dir)?;

    // Configure CORS
    let origins = config
        .allowed_origins
        .iter()
        .map(|s| s.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let log_requests = config.log_requests;
    let addr: SocketAddr = config.server_address().parse()?;

    // Build router
    let state = AppState::new(db, blobs, config);
    let mut app = routes::router(state).layer(cors);
    if log_requests {
        app = app.layer(TraceLayer::new_for_http());
    }

    // Start server
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, storage closed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

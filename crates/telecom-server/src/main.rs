use anyhow::{Context, Result};
use telecom_db::{create_pool, run_migrations};
use telecom_server::config::load_config;
use telecom_server::session::seed_initial_admin;
use telecom_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting telecom accounts server");

    // Load configuration
    let config_path =
        std::env::var("TELECOM_CONFIG").unwrap_or_else(|_| "server-config.yaml".to_string());
    tracing::info!("Loading config from: {}", config_path);
    let config = load_config(&config_path)?;

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.db.url, config.db.max_connections)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Running database migrations...");
    run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    if let Some(admin) = &config.auth.initial_admin {
        if let Err(e) = seed_initial_admin(&pool, admin).await {
            tracing::warn!("Failed to seed initial admin: {:#}", e);
        }
    }

    let listen = config.listen.clone();
    let state = AppState::new(pool, config);
    let app = telecom_server::web::build_router(state);

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("Failed to bind to {}", listen))?;

    tracing::info!("Server listening on {}", listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping...");
}

//! Clinic Booking Core - API Server Binary
//!
//! This binary starts the HTTP API server for the booking and payment
//! subsystem.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin clinic-api
//!
//! # Run with environment variables
//! API_HOST=0.0.0.0 API_PORT=8080 DATABASE_URL=postgres://... cargo run --bin clinic-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_BOOKING_FEE` - Booking fee amount (default: 100.00)
//! * `API_BOOKING_CURRENCY` - Booking fee currency (default: GHS)
//! * `API_CONFLICT_WINDOW_MINUTES` - Slot conflict radius (default: 60)
//! * `API_CARD_GATEWAY_SECRET_KEY` - Card gateway credentials
//! * `API_ALT_GATEWAY_API_KEY` - Alternative gateway credentials
//! * `API_GATE_BASE_URL` - Prerequisite gate service endpoint
//! * `API_NOTIFY_BASE_URL` - Notification dispatch endpoint
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error

use interface_api::{config::ApiConfig, create_router};
use infra_db::DatabaseConfig;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, establishes the database
/// connection, and starts the HTTP server.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config();

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting Clinic Booking Core API Server"
    );

    // Create database connection pool and verify connectivity
    let pool = DatabaseConfig::new(config.database_url.as_str())
        .connect()
        .await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!("Database ready");

    // Create the API router
    let app = create_router(pool, config.clone())?;

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads API configuration from environment variables.
///
/// Falls back to defaults with targeted environment overrides when the
/// typed deserialization does not apply cleanly.
fn load_config() -> ApiConfig {
    ApiConfig::from_env().unwrap_or_else(|_| {
        let defaults = ApiConfig::default();
        ApiConfig {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            jwt_secret: std::env::var("API_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration_secs: std::env::var("API_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_expiration_secs),
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("API_DATABASE_URL"))
                .unwrap_or(defaults.database_url),
            log_level: std::env::var("API_LOG_LEVEL")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            booking_fee: std::env::var("API_BOOKING_FEE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.booking_fee),
            booking_currency: std::env::var("API_BOOKING_CURRENCY")
                .unwrap_or(defaults.booking_currency),
            conflict_window_minutes: std::env::var("API_CONFLICT_WINDOW_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.conflict_window_minutes),
            late_window_hours: std::env::var("API_LATE_WINDOW_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.late_window_hours),
            poll_interval_secs: std::env::var("API_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.poll_interval_secs),
            poll_max_attempts: std::env::var("API_POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.poll_max_attempts),
            card_gateway_base_url: std::env::var("API_CARD_GATEWAY_BASE_URL")
                .unwrap_or(defaults.card_gateway_base_url),
            card_gateway_secret_key: std::env::var("API_CARD_GATEWAY_SECRET_KEY")
                .unwrap_or(defaults.card_gateway_secret_key),
            card_gateway_callback_url: std::env::var("API_CARD_GATEWAY_CALLBACK_URL")
                .unwrap_or(defaults.card_gateway_callback_url),
            alt_gateway_base_url: std::env::var("API_ALT_GATEWAY_BASE_URL")
                .unwrap_or(defaults.alt_gateway_base_url),
            alt_gateway_api_key: std::env::var("API_ALT_GATEWAY_API_KEY")
                .unwrap_or(defaults.alt_gateway_api_key),
            gate_base_url: std::env::var("API_GATE_BASE_URL").unwrap_or(defaults.gate_base_url),
            gate_api_key: std::env::var("API_GATE_API_KEY").unwrap_or(defaults.gate_api_key),
            notify_base_url: std::env::var("API_NOTIFY_BASE_URL")
                .unwrap_or(defaults.notify_base_url),
            notify_api_key: std::env::var("API_NOTIFY_API_KEY")
                .unwrap_or(defaults.notify_api_key),
        }
    })
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// This enables graceful shutdown of the server, allowing in-flight
/// requests to complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

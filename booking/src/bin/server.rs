//! Booking Service Server
//!
//! This binary:
//! - Loads configuration from the environment (and `.env`)
//! - Connects to `PostgreSQL` and applies migrations
//! - Starts the background sweeps
//! - Serves the HTTP API until Ctrl+C or SIGTERM
//!
//! # Usage
//!
//! ```bash
//! docker compose up -d postgres
//! cargo run --bin server
//! ```

use anyhow::Context;
use booking::app::Collaborators;
use booking::auth::SupabaseAuth;
use booking::server::{self, AppState};
use booking::{Config, build_router};
use clubpass_core::environment::SystemClock;
use clubpass_postgres::{PgBookingRepository, PgEventRepository, PgProfileRepository};
use clubpass_razorpay::RazorpayClient;
use clubpass_runtime::metrics::MetricsRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,booking=debug,clubpass=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting booking server...");

    let config = Config::from_env().context("Invalid configuration")?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        razorpay = ?config.razorpay,
        "Configuration loaded"
    );

    let metrics = if config.metrics.enabled {
        Some(MetricsRegistry::install().context("Failed to install metrics recorder")?)
    } else {
        None
    };

    let pool = clubpass_postgres::connect(&config.database.pool_settings())
        .await
        .context("Failed to connect to PostgreSQL")?;
    clubpass_postgres::migrate(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("✓ Database ready");

    let gateway = RazorpayClient::new(&config.razorpay.key_id, &config.razorpay.key_secret)
        .with_api_url(&config.razorpay.api_url);
    let auth = SupabaseAuth::new(&config.auth.url, &config.auth.anon_key);

    let collaborators = Collaborators {
        events: Arc::new(PgEventRepository::new(pool.clone())),
        profiles: Arc::new(PgProfileRepository::new(pool.clone())),
        bookings: Arc::new(PgBookingRepository::new(pool.clone())),
        gateway: Arc::new(gateway),
        clock: Arc::new(SystemClock),
    };
    let state = AppState::new(collaborators, Arc::new(auth), Arc::new(pool), &config);

    let sweeper = state.sweeper(&config.sweeper).start();
    tracing::info!(tasks = sweeper.task_count(), "✓ Background sweeps started");

    let app = build_router(state, metrics);
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!(%address, "HTTP server listening for requests");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await
    .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped, stopping background sweeps...");
    if let Err(failed) = sweeper.shutdown(config.server.shutdown_timeout).await {
        tracing::warn!(tasks = ?failed, "Some sweeps did not stop cleanly");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

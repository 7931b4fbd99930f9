//! Warden API server binary.
//!
//! Loads configuration, migrates the database, seeds the built-in roles and
//! serves the HTTP API until interrupted.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warden_api::config::{ApiConfig, DEFAULT_PORT};
use warden_core::auth::password::DEFAULT_COST;
use warden_core::directory::{PgDirectory, seed_default_roles};

const DEFAULT_LOG_FILTER: &str = "info,warden_api=debug,warden_core=debug";

/// CLI arguments for the API server.
#[derive(Parser)]
#[command(name = "warden_api_server", about = "Warden user-management API server")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "SERVER_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DB_DSN", hide_env_values = true)]
    database_url: String,

    /// HMAC secret for signing tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// bcrypt cost for new password hashes.
    #[arg(long, env = "BCRYPT_COST", default_value_t = DEFAULT_COST)]
    bcrypt_cost: u32,

    /// Require access tokens on protected routes and refresh tokens on refresh.
    #[arg(long, env = "STRICT_TOKEN_KIND", default_value_t = false)]
    strict_token_kind: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig::new(args.port, args.database_url, args.jwt_secret)?
        .with_bcrypt_cost(args.bcrypt_cost)?
        .with_strict_token_kind(args.strict_token_kind);

    info!(
        version = warden_core::version(),
        port = args.port,
        bcrypt_cost = config.bcrypt_cost,
        strict_token_kind = config.strict_token_kind,
        "starting warden_api_server"
    );

    info!(max_connections = args.max_connections, "configuring connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    warden_api::migrate(&pool).await?;

    let directory = Arc::new(PgDirectory::new(pool));
    seed_default_roles(directory.as_ref()).await?;

    let state = warden_api::AppState::new(&config, directory)?;
    let app = warden_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

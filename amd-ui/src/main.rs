//! amd-ui - administrative interface for the voicemail/AMD platform
//!
//! JSON API for operators and administrators plus the provisioning API used
//! by the external license server.

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use amd_common::config::Config;
use amd_common::db::{init_database, seed_default_admin, seed_default_roles};
use amd_ui::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "amd-ui", about = "AMD administrative interface")]
struct Args {
    /// Data folder holding the SQLite database (falls back to AMD_DATA_DIR,
    /// the config file, then the platform default)
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber before anything that can log
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting AMD administrative interface (amd-ui) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();
    let config = Config::load(args.data_dir.as_deref())?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Connected to database");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    seed_default_roles(&pool).await?;
    seed_default_admin(&pool, &config.default_admin_password, &config.recognizer).await?;

    let state = AppState::new(
        pool,
        config.license_access_token.clone(),
        config.recognizer.clone(),
    );
    let app = build_router(state);

    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("amd-ui listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

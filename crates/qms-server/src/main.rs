//! QMS Audit Trail Server - Main entry point

use anyhow::{Context, Result};
use qms_common::logging::{init_logging, LogConfig};
use tracing::info;

use qms_server::{
    api::{self, AppState},
    config::Config,
    db,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // LOG_* variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("qms-server")
        .filter_directives("qms_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    info!("Starting QMS server");

    let config = Config::load()?;
    info!(
        bind = %config.bind_address(),
        max_connections = config.database.max_connections,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to the database")?;

    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let state = AppState::new(pool, config.audit);

    api::serve(&config, state).await?;

    Ok(())
}

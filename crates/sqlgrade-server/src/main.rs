//! SQL practice server
//!
//! Serves the practice dataset over a JSON API: learners run queries, see
//! rendered results, and submit attempts that are graded against each
//! question's reference result.

use tracing::info;

mod api;
mod config;
mod logging;
mod metrics;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("SQLGRADE_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path)?;
    config.apply_logging_env();
    logging::init();

    info!(config = %config_path, "configuration loaded");

    // Seeding and reference queries run on the blocking pool
    let startup_config = config.clone();
    let state = tokio::task::spawn_blocking(move || AppState::build(&startup_config)).await??;

    let app = api::router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "sqlgrade server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

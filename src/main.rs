use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use courtbook::config::{AppConfig, BookingPolicy};
use courtbook::db;
use courtbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    let policy = BookingPolicy::from_config(&config)?;

    let conn = db::init_db(&config.database_url)?;

    tracing::info!(
        timezone = %policy.timezone,
        coach = %config.coach_id,
        "scheduling in operating timezone"
    );

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        policy,
    });

    let app = courtbook::app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

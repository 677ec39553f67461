//! Contta API Server
//!
//! Main entry point for the Contta back office service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use contta_ai::AiGateway;
use contta_api::{AppState, create_router};
use contta_core::classification::ClassificationAdvisor;
use contta_db::connect_pool;
use contta_shared::AppConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "contta=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_advisor(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn ClassificationAdvisor>>> {
    if !config.ai.enabled {
        info!("AI classification disabled");
        return Ok(None);
    }
    if config.ai.api_key.is_empty() {
        warn!("AI classification enabled without an API key; requests will be rejected");
    }
    let gateway = AiGateway::from_config(&config.ai).context("Failed to build AI gateway")?;
    info!(model = %config.ai.model, base_url = %config.ai.base_url, "AI classification enabled");
    Ok(Some(Arc::new(gateway)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let advisor = build_advisor(&config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(db, config, advisor)?;

    let app = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

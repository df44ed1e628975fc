mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pulso_api::http::rpc_router;
use pulso_api::procedures;
use pulso_api::state::{AppState, AppStateInner};
use pulso_db::{Database, Store};
use pulso_llm::{Chatbot, ChatbotConfig};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pulso=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Storage has an explicit lifecycle: opened here, degraded to a
    // disconnected store when unconfigured.
    let store = match &config.db_path {
        Some(path) => Store::connected(
            Database::open(&PathBuf::from(path))?,
            config.owner_open_id.clone(),
        ),
        None => {
            warn!("PULSO_DB_PATH not set; running with storage disabled");
            Store::disconnected(config.owner_open_id.clone())
        }
    };

    let chatbot = Chatbot::new(ChatbotConfig {
        api_url: config.llm_api_url.clone(),
        api_key: config.llm_api_key.clone(),
        model: config.llm_model.clone(),
    });

    let state: AppState = Arc::new(AppStateInner {
        store,
        chatbot,
        jwt_secret: config.jwt_secret.clone(),
    });

    let registry = Arc::new(procedures::registry()?);
    info!("registered {} procedures", registry.len());

    let app = rpc_router(state, registry)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Pulso server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

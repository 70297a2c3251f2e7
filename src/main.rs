use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use fieldcrm::api_router::configure_api_routes;
use fieldcrm::channels::whatsapp::WhatsAppClient;
use fieldcrm::config::AppConfig;
use fieldcrm::llm::GeminiClient;
use fieldcrm::shared::state::AppState;
use fieldcrm::shared::utils::create_conn;
use fieldcrm::storage::StorageClient;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .write_style(env_logger::WriteStyle::Always)
        .init();

    let config = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("failed to load config: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                e.to_string(),
            ));
        }
    };

    let pool = match create_conn(&config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            error!("failed to create database pool: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e.to_string(),
            ));
        }
    };

    let storage = StorageClient::new(&config.storage);
    let whatsapp = WhatsAppClient::new(&config.whatsapp);
    let analyzer = Arc::new(GeminiClient::new(config.gemini.api_key.clone()));

    let state = Arc::new(AppState {
        conn: pool,
        config: config.clone(),
        storage,
        whatsapp,
        analyzer,
    });

    let app = configure_api_routes()
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}

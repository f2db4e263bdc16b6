mod companies;
mod marketcap;
mod broadcast;
mod websocket;
mod api;
mod config;

use std::time::Duration;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::interval;
use log::{info, error};
use tower_http::cors::CorsLayer;

use crate::config::{Config, STATS_INTERVAL_SECS};
use crate::companies::{CompanyLoader, CompanyLadder};
use crate::marketcap::{PriceFeed, MarketCapPipeline};
use crate::broadcast::{BroadcastHub, run_rank_resolver};
use crate::websocket::WebSocketHandler;
use crate::api::{ApiState, create_api_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    // Log configuration
    config.log_config();

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e.into());
    }
    let total_supply = config.total_supply()?;

    // Load the company ladder
    let companies = match CompanyLoader::load_from_csv(&config.companies_file) {
        Ok(companies) => companies,
        Err(e) => {
            error!("Failed to load companies from {}: {}", config.companies_file, e);
            return Err(e);
        }
    };
    let ladder = Arc::new(CompanyLadder::new(companies));
    info!("📊 Loaded {} companies from {}", ladder.len(), config.companies_file);

    // Valuation pipeline feeding the rank resolver through an update channel
    let hub = Arc::new(BroadcastHub::new());
    let (update_tx, update_rx) = mpsc::unbounded_channel();

    let feed = Arc::new(PriceFeed::new(&config.rpc_url, &config.rpc_api_key)?);
    let pipeline = MarketCapPipeline::new(
        feed,
        config.quote_vault_address.clone(),
        config.token_vault_address.clone(),
        total_supply,
        update_tx,
    );
    pipeline.spawn();

    tokio::spawn(run_rank_resolver(update_rx, ladder.clone(), hub.clone()));

    // Start background tasks
    start_background_tasks(hub.clone()).await;

    // Start API server
    let api_state = ApiState {
        hub: hub.clone(),
        ladder: ladder.clone(),
    };

    let api_router = create_api_router(api_state)
        .layer(CorsLayer::permissive()); // Enable CORS for web clients

    let api_bind_address = config.api_bind_address.clone();
    let api_listener = TcpListener::bind(&api_bind_address).await?;
    info!("🌐 HTTP API server running at http://{}", api_bind_address);

    let api_server = async move { axum::serve(api_listener, api_router).await };

    // Start WebSocket server
    let ws_bind_address = config.bind_address.clone();
    let ws_listener = TcpListener::bind(&ws_bind_address).await?;
    info!("🚀 WebSocket feed running at ws://{}", ws_bind_address);

    let websocket_server = async move {
        while let Ok((stream, addr)) = ws_listener.accept().await {
            let handler = WebSocketHandler::new(hub.clone(), addr.to_string());

            tokio::spawn(async move {
                handler.handle_connection(stream).await;
            });
        }
    };

    // Run both servers concurrently
    tokio::select! {
        result = api_server => {
            error!("API server stopped: {:?}", result);
        }
        _ = websocket_server => {
            error!("WebSocket server stopped");
        }
    }

    Ok(())
}

async fn start_background_tasks(hub: Arc<BroadcastHub>) {
    // Subscriber stats task
    tokio::spawn(async move {
        let mut interval_timer = interval(Duration::from_secs(STATS_INTERVAL_SECS));

        loop {
            interval_timer.tick().await;

            let count = hub.subscriber_count();
            if count > 0 {
                info!("Active subscribers: {}", count);
            }
        }
    });

    info!("📈 Started stats monitoring task (every {} seconds)", STATS_INTERVAL_SECS);
}

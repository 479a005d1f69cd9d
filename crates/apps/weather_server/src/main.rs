use std::net::SocketAddr;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use weather_server::rate_limit::spawn_purge_task;
use weather_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::parse();
    if config.api_key().is_none() {
        warn!("OPENWEATHER_API_KEY is not set; weather requests will fail with 500");
    }

    let http = reqwest::Client::builder().build()?;
    let state = AppState::from_config(&config, http);
    spawn_purge_task(state.limiter.clone());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("weather server listening on http://{addr}");
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

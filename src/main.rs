use anyhow::Context;
use log::info;
use warp::Filter;
use std::net::SocketAddr;
use std::sync::Arc;

use stock_research_dashboard::config::AppConfig;
use stock_research_dashboard::routes;
use stock_research_dashboard::services::provider::FinancialDataProvider;
use stock_research_dashboard::services::yahoo::YahooProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the logger so RUST_LOG can live there
    dotenv::dotenv().ok();
    env_logger::init();
    info!("Logger initialized. Starting the application...");

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!("Using PORT: {}", config.port);

    let provider: Arc<dyn FinancialDataProvider> = Arc::new(
        YahooProvider::new(
            config.yahoo_query_url.clone(),
            config.yahoo_timeseries_url.clone(),
            config.yahoo_timeout,
        )
        .context("Failed to build Yahoo Finance client")?,
    );

    // Bind to 0.0.0.0 so the server is reachable from outside a container
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    info!("Will bind to: {}", addr);

    // Set up CORS
    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("content-type")
        .allow_methods(vec!["GET"]);

    let api = routes::routes(provider, Arc::new(config)).with(cors);
    info!("Routes configured successfully with CORS.");

    info!("Starting server on {}", addr);
    warp::serve(api).run(addr).await;
    Ok(())
}

// src/handlers/peers.rs
use serde::Serialize;
use warp::reply::Json;
use warp::Rejection;
use log::info;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::peers::{compare, CompetitorMap, ComparisonFocus, PeerComparison, UNKNOWN_INDUSTRY};
use crate::services::provider::FinancialDataProvider;
use super::cash::cash_position;
use super::{normalize_ticker, primary_info};

#[derive(Debug, Serialize)]
pub struct PeersResponse {
    pub industry: String,
    pub sector: Option<String>,
    pub focus: ComparisonFocus,
    #[serde(flatten)]
    pub comparison: PeerComparison,
}

pub async fn get_peers(
    ticker: String,
    provider: Arc<dyn FinancialDataProvider>,
    config: Arc<AppConfig>,
) -> Result<Json, Rejection> {
    info!("Handling request to get peer comparison for {}", ticker);
    let ticker = normalize_ticker(&ticker).map_err(warp::reject::custom)?;

    let info = primary_info(provider.as_ref(), &ticker).await?;
    let competitors = CompetitorMap::default().competitors(&ticker, info.sector.as_deref());
    info!("Comparing {} with {}", ticker, competitors.join(", "));

    let (comparison, position) = futures::join!(
        compare(provider.as_ref(), &ticker, &competitors),
        cash_position(provider.as_ref(), &ticker, &config)
    );

    Ok(warp::reply::json(&PeersResponse {
        industry: info.industry.clone().unwrap_or_else(|| UNKNOWN_INDUSTRY.to_string()),
        sector: info.sector.clone(),
        focus: ComparisonFocus::for_cash_burning(position.is_burning()),
        comparison,
    }))
}

// src/handlers/returns.rs
use serde::Serialize;
use warp::reply::Json;
use warp::Rejection;
use log::{error, info};
use std::sync::Arc;

use crate::models::HistoryRange;
use crate::services::provider::FinancialDataProvider;
use crate::services::returns::{historical_returns, HistoricalReturns};
use super::error::ApiError;
use super::normalize_ticker;

#[derive(Debug, Serialize)]
pub struct ReturnsResponse {
    pub ticker: String,
    pub last_close: Option<f64>,
    pub sessions: usize,
    pub returns: HistoricalReturns,
}

pub async fn get_returns(
    ticker: String,
    provider: Arc<dyn FinancialDataProvider>,
) -> Result<Json, Rejection> {
    info!("Handling request to get historical returns for {}", ticker);
    let ticker = normalize_ticker(&ticker).map_err(warp::reject::custom)?;

    let history = provider
        .price_history(&ticker, HistoryRange::Max)
        .await
        .map_err(|e| {
            error!("Failed to fetch price history for {}: {}", ticker, e);
            warp::reject::custom(ApiError::upstream(&ticker, e))
        })?;

    let returns = historical_returns(&history);
    Ok(warp::reply::json(&ReturnsResponse {
        last_close: history.bars.last().map(|bar| bar.close),
        sessions: history.bars.len(),
        ticker,
        returns,
    }))
}

// src/handlers/valuation.rs
use serde::Serialize;
use warp::reply::Json;
use warp::Rejection;
use log::{info, warn};
use std::sync::Arc;

use crate::models::{HistoryRange, PriceHistory, StatementKind};
use crate::services::provider::FinancialDataProvider;
use crate::services::valuation::{resolve_valuation, PegBand, ValuationContext, ValuationResult};
use crate::services::verdict::MarketVerdict;
use super::{normalize_ticker, primary_info};

#[derive(Debug, Serialize)]
pub struct ValuationResponse {
    pub ticker: String,
    pub current_price: Option<f64>,
    #[serde(flatten)]
    pub valuation: ValuationResult,
    pub peg_band: Option<PegBand>,
    /// Filings P/E minus market P/E, when they disagree noticeably.
    pub pe_divergence: Option<f64>,
    pub verdict: MarketVerdict,
}

pub async fn get_valuation(
    ticker: String,
    provider: Arc<dyn FinancialDataProvider>,
) -> Result<Json, Rejection> {
    info!("Handling request to get valuation for {}", ticker);
    let ticker = normalize_ticker(&ticker).map_err(warp::reject::custom)?;

    let (info, income, history) = futures::join!(
        primary_info(provider.as_ref(), &ticker),
        provider.statement(&ticker, StatementKind::Income),
        provider.price_history(&ticker, HistoryRange::OneYear)
    );
    let info = info?;
    let income = income
        .map_err(|e| warn!("Income statement unavailable for {}, using market data: {}", ticker, e))
        .ok();
    let history = history.unwrap_or_else(|e| {
        warn!("Price history unavailable for {}, skipping momentum: {}", ticker, e);
        PriceHistory::default()
    });
    let verdict = MarketVerdict::evaluate(&info, &history);

    let ctx = ValuationContext::new(&info, income);
    let valuation = resolve_valuation(&ctx);

    let response = ValuationResponse {
        ticker,
        current_price: info.current_price,
        peg_band: valuation.peg.map(|peg| PegBand::classify(peg.value)),
        pe_divergence: valuation.pe_divergence(),
        valuation,
        verdict,
    };
    Ok(warp::reply::json(&response))
}

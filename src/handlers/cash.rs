// src/handlers/cash.rs
use serde::Serialize;
use warp::reply::Json;
use warp::Rejection;
use log::info;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::StatementKind;
use crate::services::cash::{classify_statements, CashPosition};
use crate::services::provider::FinancialDataProvider;
use super::{normalize_ticker, primary_info};

#[derive(Debug, Serialize)]
pub struct CashResponse {
    pub ticker: String,
    #[serde(flatten)]
    pub position: CashPosition,
}

/// Cash position from the latest filings. The ticker itself must resolve;
/// missing statements for a known ticker give an unknown position.
pub async fn get_cash_position(
    ticker: String,
    provider: Arc<dyn FinancialDataProvider>,
    config: Arc<AppConfig>,
) -> Result<Json, Rejection> {
    info!("Handling request to get cash position for {}", ticker);
    let ticker = normalize_ticker(&ticker).map_err(warp::reject::custom)?;

    let (info, position) = futures::join!(
        primary_info(provider.as_ref(), &ticker),
        cash_position(provider.as_ref(), &ticker, &config)
    );
    info?;
    Ok(warp::reply::json(&CashResponse { ticker, position }))
}

pub(crate) async fn cash_position(
    provider: &dyn FinancialDataProvider,
    ticker: &str,
    config: &AppConfig,
) -> CashPosition {
    let (cash_flow, balance_sheet) = futures::join!(
        provider.statement(ticker, StatementKind::CashFlow),
        provider.statement(ticker, StatementKind::BalanceSheet)
    );
    classify_statements(cash_flow.as_ref(), balance_sheet.as_ref(), config.missing_fcf_policy)
}

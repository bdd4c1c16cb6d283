// src/handlers/financials.rs
use serde::Serialize;
use warp::reply::Json;
use warp::Rejection;
use log::{error, info, warn};
use std::sync::Arc;

use crate::models::{FinancialStatement, StatementKind};
use crate::services::calculations::{summarize_financials, FinancialsSummary};
use crate::services::provider::FinancialDataProvider;
use super::error::ApiError;
use super::normalize_ticker;

#[derive(Debug, Serialize)]
pub struct FinancialsResponse {
    pub ticker: String,
    pub statements: Vec<FinancialStatement>,
    pub summary: FinancialsSummary,
}

/// The three annual statements plus derived ratios. Statements the provider
/// cannot supply are left out; the request fails only when none are available.
pub async fn get_financials(
    ticker: String,
    provider: Arc<dyn FinancialDataProvider>,
) -> Result<Json, Rejection> {
    info!("Handling request to get financial statements for {}", ticker);
    let ticker = normalize_ticker(&ticker).map_err(warp::reject::custom)?;

    let results = futures::future::join_all(
        StatementKind::ALL
            .iter()
            .map(|kind| provider.statement(&ticker, *kind)),
    )
    .await;

    let mut statements = Vec::new();
    let mut last_error = None;
    for (kind, result) in StatementKind::ALL.iter().zip(results) {
        match result {
            Ok(statement) => statements.push(statement),
            Err(e) => {
                warn!("{} statement unavailable for {}: {}", kind.as_str(), ticker, e);
                last_error = Some(e);
            }
        }
    }

    if statements.is_empty() {
        if let Some(e) = last_error {
            error!("No financial statements available for {}", ticker);
            return Err(warp::reject::custom(ApiError::upstream(&ticker, e)));
        }
    }

    let find = |kind: StatementKind| statements.iter().find(|s| s.kind == kind);
    let summary = summarize_financials(find(StatementKind::Income), find(StatementKind::BalanceSheet));

    Ok(warp::reply::json(&FinancialsResponse {
        ticker,
        statements,
        summary,
    }))
}

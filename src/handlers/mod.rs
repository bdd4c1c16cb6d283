// src/handlers/mod.rs
use log::error;
use once_cell::sync::Lazy;
use regex::Regex;
use warp::Rejection;

use crate::models::CompanyInfo;
use crate::services::provider::FinancialDataProvider;
use self::error::ApiError;

pub mod cash;
pub mod dcf;
pub mod error;
pub mod financials;
pub mod peers;
pub mod returns;
pub mod valuation;

/// Letters, digits and the `.`, `-`, `^`, `=` used by class shares, indices and futures.
const TICKER_PATTERN: &str = r"^[A-Z0-9.\-^=]{1,12}$";

static TICKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(TICKER_PATTERN).expect("ticker pattern must compile"));

/// Decodes and upper-cases a ticker path segment, rejecting anything that
/// does not look like a symbol.
pub fn normalize_ticker(raw: &str) -> Result<String, ApiError> {
    let decoded = urlencoding::decode(raw)
        .map_err(|_| ApiError::invalid_input(format!("ticker '{}' is not valid UTF-8", raw)))?;
    let ticker = decoded.trim().to_ascii_uppercase();

    if !TICKER_RE.is_match(&ticker) {
        return Err(ApiError::invalid_input(format!("'{}' is not a valid ticker symbol", ticker)));
    }
    Ok(ticker)
}

/// Company info for the ticker a request is about. Failing here ends the request.
pub(crate) async fn primary_info(
    provider: &dyn FinancialDataProvider,
    ticker: &str,
) -> Result<CompanyInfo, Rejection> {
    provider.company_info(ticker).await.map_err(|e| {
        error!("Failed to fetch company info for {}: {}", ticker, e);
        warp::reject::custom(ApiError::upstream(ticker, e))
    })
}

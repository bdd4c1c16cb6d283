// src/handlers/dcf.rs
use serde::{Deserialize, Serialize};
use warp::reply::Json;
use warp::Rejection;
use log::{error, info, warn};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::StatementKind;
use crate::services::dcf::{intrinsic_value, DcfAssumptions, DcfInputs, DcfOverrides, DcfValuation, DcfVerdict};
use crate::services::provider::FinancialDataProvider;
use super::error::ApiError;
use super::{normalize_ticker, primary_info};

/// Query string of the DCF endpoint. Rates are percentages (10 = 10%).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DcfQuery {
    pub fcf: Option<f64>,
    pub growth: Option<f64>,
    pub terminal: Option<f64>,
    pub wacc: Option<f64>,
    pub debt: Option<f64>,
    pub cash: Option<f64>,
}

impl DcfQuery {
    /// Rates as fractions, falling back to the configured defaults.
    pub fn assumptions(&self, defaults: DcfAssumptions) -> DcfAssumptions {
        let fraction = |pct: Option<f64>, default: f64| pct.map(|p| p / 100.0).unwrap_or(default);
        DcfAssumptions {
            growth_rate_5yr: fraction(self.growth, defaults.growth_rate_5yr),
            terminal_growth_rate: fraction(self.terminal, defaults.terminal_growth_rate),
            discount_rate: fraction(self.wacc, defaults.discount_rate),
        }
    }

    pub fn overrides(&self) -> DcfOverrides {
        DcfOverrides {
            free_cash_flow: self.fcf,
            total_debt: self.debt,
            cash_and_equivalents: self.cash,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DcfResponse {
    pub ticker: String,
    pub current_price: Option<f64>,
    pub inputs: DcfInputs,
    pub valuation: DcfValuation,
    pub verdict: Option<DcfVerdict>,
}

pub async fn get_dcf(
    ticker: String,
    query: DcfQuery,
    provider: Arc<dyn FinancialDataProvider>,
    config: Arc<AppConfig>,
) -> Result<Json, Rejection> {
    info!("Handling request to get DCF valuation for {}", ticker);
    let ticker = normalize_ticker(&ticker).map_err(warp::reject::custom)?;

    let (info, cash_flow, balance_sheet) = futures::join!(
        primary_info(provider.as_ref(), &ticker),
        provider.statement(&ticker, StatementKind::CashFlow),
        provider.statement(&ticker, StatementKind::BalanceSheet)
    );
    let info = info?;
    let cash_flow = cash_flow
        .map_err(|e| warn!("Cash flow statement unavailable for {}: {}", ticker, e))
        .ok();
    let balance_sheet = balance_sheet
        .map_err(|e| warn!("Balance sheet unavailable for {}: {}", ticker, e))
        .ok();

    let inputs = DcfInputs::from_filings(
        cash_flow.as_ref(),
        balance_sheet.as_ref(),
        &info,
        query.assumptions(config.dcf_defaults),
        query.overrides(),
    )
    .and_then(|inputs| intrinsic_value(&inputs).map(|valuation| (inputs, valuation)));

    let (inputs, valuation) = inputs.map_err(|e| {
        error!("DCF not computable for {}: {}", ticker, e);
        warp::reject::custom(ApiError::from(e))
    })?;

    let verdict = DcfVerdict::against(valuation.per_share_value, info.current_price);
    Ok(warp::reply::json(&DcfResponse {
        ticker,
        current_price: info.current_price,
        inputs,
        valuation,
        verdict,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_percentages_become_fractions() {
        let defaults = AppConfig::default().dcf_defaults;
        let query = DcfQuery { growth: Some(20.0), wacc: Some(12.0), ..Default::default() };
        let assumptions = query.assumptions(defaults);
        assert_eq!(assumptions.growth_rate_5yr, 0.2);
        assert_eq!(assumptions.discount_rate, 0.12);
        assert_eq!(assumptions.terminal_growth_rate, defaults.terminal_growth_rate);
    }
}

// src/services/cash.rs
use serde::{Serialize, Deserialize};
use log::{info, warn};

use crate::models::FinancialStatement;
use super::dcf::latest_free_cash_flow;
use super::error::ProviderError;

/// Runway reported when a burning company's monthly burn normalizes to zero.
/// An approximation, not a computed figure.
pub const RUNWAY_SENTINEL_MONTHS: f64 = 999.0;

/// Free cash flow substituted when the filings carry none under
/// [`MissingCashFlowPolicy::AssumeBurning`].
const ASSUMED_FREE_CASH_FLOW: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CashStatus {
    CashStable,
    CashBurning,
    Unknown,
}

/// What to conclude when the latest free cash flow is not reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCashFlowPolicy {
    /// Treat the company as burning a token -1 per year.
    #[default]
    AssumeBurning,
    /// Report the position as unknown.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashPosition {
    pub status: CashStatus,
    pub monthly_burn: Option<f64>,
    pub runway_months: Option<f64>,
    /// The burn comes from the missing-cash-flow default, not from filings.
    pub burn_assumed: bool,
}

impl CashPosition {
    pub fn unknown() -> Self {
        Self {
            status: CashStatus::Unknown,
            monthly_burn: None,
            runway_months: None,
            burn_assumed: false,
        }
    }

    pub fn is_burning(&self) -> bool {
        self.status == CashStatus::CashBurning
    }
}

/// Classifies from the latest annual free cash flow and cash on hand.
/// Missing cash on hand counts as zero.
pub fn classify(
    latest_fcf: Option<f64>,
    cash_on_hand: Option<f64>,
    policy: MissingCashFlowPolicy,
) -> CashPosition {
    let (fcf, burn_assumed) = match latest_fcf.filter(|v| v.is_finite()) {
        Some(fcf) => (fcf, false),
        None => match policy {
            MissingCashFlowPolicy::AssumeBurning => {
                warn!("No free cash flow reported; assuming the company is burning cash");
                (ASSUMED_FREE_CASH_FLOW, true)
            }
            MissingCashFlowPolicy::Unknown => return CashPosition::unknown(),
        },
    };

    if fcf >= 0.0 {
        return CashPosition {
            status: CashStatus::CashStable,
            monthly_burn: None,
            runway_months: None,
            burn_assumed: false,
        };
    }

    let cash = cash_on_hand.filter(|v| v.is_finite()).unwrap_or(0.0);
    let monthly_burn = fcf.abs() / 12.0;
    let runway_months = if monthly_burn > 0.0 {
        cash / monthly_burn
    } else {
        RUNWAY_SENTINEL_MONTHS
    };

    CashPosition {
        status: CashStatus::CashBurning,
        monthly_burn: Some(monthly_burn),
        runway_months: Some(runway_months),
        burn_assumed,
    }
}

/// Classifies from statement fetch results. Failing to obtain either
/// statement yields an unknown position rather than an error.
///
/// Free cash flow is read the same way the DCF reads it: the reported
/// figure first, then operating cash flow plus capital expenditure. The
/// missing-cash-flow policy only applies when neither is present.
pub fn classify_statements(
    cash_flow: Result<&FinancialStatement, &ProviderError>,
    balance_sheet: Result<&FinancialStatement, &ProviderError>,
    policy: MissingCashFlowPolicy,
) -> CashPosition {
    let (cash_flow, balance_sheet) = match (cash_flow, balance_sheet) {
        (Ok(cf), Ok(bs)) => (cf, bs),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Cash position unknown, statement unavailable: {}", e);
            return CashPosition::unknown();
        }
    };

    let fcf = latest_free_cash_flow(cash_flow);
    let cash = balance_sheet.latest("Cash And Cash Equivalents");
    let position = classify(fcf, cash, policy);
    info!("Cash position classified as {:?}", position.status);
    position
}

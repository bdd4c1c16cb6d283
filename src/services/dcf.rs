// src/services/dcf.rs
//! Five-period discounted cash flow model with a Gordon-growth terminal value.

use serde::{Serialize, Deserialize};
use log::{debug, warn};

use crate::models::{CompanyInfo, FinancialStatement};
use super::error::ValuationError;

/// Number of explicitly projected periods before the terminal value.
pub const PROJECTION_PERIODS: i32 = 5;

/// Model inputs. Every rate is a fraction (0.10 = 10%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfInputs {
    pub latest_free_cash_flow: f64,
    pub growth_rate_5yr: f64,
    pub terminal_growth_rate: f64,
    pub discount_rate: f64,
    pub total_debt: f64,
    pub cash_and_equivalents: f64,
    pub shares_outstanding: Option<f64>,
}

/// Rate assumptions the caller supplies; the filings supply the rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    pub growth_rate_5yr: f64,
    pub terminal_growth_rate: f64,
    pub discount_rate: f64,
}

/// Values a user typed in; any of them replaces the filings-derived figure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DcfOverrides {
    pub free_cash_flow: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
}

impl DcfInputs {
    /// Builds inputs from the latest annual filings.
    ///
    /// Free cash flow is read from "Free Cash Flow", else operating cash flow
    /// plus capital expenditure (reported negative). Debt falls back to long
    /// term debt. Missing debt or cash count as zero.
    pub fn from_filings(
        cash_flow: Option<&FinancialStatement>,
        balance_sheet: Option<&FinancialStatement>,
        info: &CompanyInfo,
        assumptions: DcfAssumptions,
        overrides: DcfOverrides,
    ) -> Result<Self, ValuationError> {
        let filed_fcf = cash_flow.and_then(latest_free_cash_flow);
        let latest_free_cash_flow = overrides
            .free_cash_flow
            .or(filed_fcf)
            .ok_or_else(|| ValuationError::missing("no free cash flow in filings"))?;

        let total_debt = overrides.total_debt.unwrap_or_else(|| {
            balance_sheet
                .and_then(|bs| bs.first_row(&["Total Debt", "Long Term Debt"]))
                .and_then(|row| row.latest())
                .unwrap_or(0.0)
        });

        let cash_and_equivalents = overrides.cash_and_equivalents.unwrap_or_else(|| {
            balance_sheet
                .and_then(|bs| bs.latest("Cash And Cash Equivalents"))
                .unwrap_or(0.0)
        });

        Ok(Self {
            latest_free_cash_flow,
            growth_rate_5yr: assumptions.growth_rate_5yr,
            terminal_growth_rate: assumptions.terminal_growth_rate,
            discount_rate: assumptions.discount_rate,
            total_debt,
            cash_and_equivalents,
            shares_outstanding: info.shares_outstanding,
        })
    }

    /// Checks the preconditions the model is defined under.
    pub fn validate(&self) -> Result<(), ValuationError> {
        let fields = [
            ("latest_free_cash_flow", self.latest_free_cash_flow),
            ("growth_rate_5yr", self.growth_rate_5yr),
            ("terminal_growth_rate", self.terminal_growth_rate),
            ("discount_rate", self.discount_rate),
            ("total_debt", self.total_debt),
            ("cash_and_equivalents", self.cash_and_equivalents),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValuationError::invalid(format!("{} is not a finite number", name)));
        }
        if self.latest_free_cash_flow <= 0.0 {
            return Err(ValuationError::invalid(
                "DCF needs a positive base free cash flow",
            ));
        }
        if self.discount_rate <= self.terminal_growth_rate {
            return Err(ValuationError::invalid(format!(
                "discount rate {} must exceed terminal growth {}",
                self.discount_rate, self.terminal_growth_rate
            )));
        }
        Ok(())
    }
}

/// Latest annual free cash flow from a cash-flow statement.
pub fn latest_free_cash_flow(cash_flow: &FinancialStatement) -> Option<f64> {
    if let Some(fcf) = cash_flow.latest("Free Cash Flow") {
        return Some(fcf);
    }
    let operating = cash_flow
        .first_row(&["Operating Cash Flow", "Total Cash From Operating Activities"])
        .and_then(|row| row.latest())?;
    let capex = cash_flow
        .first_row(&["Capital Expenditure", "Capital Expenditures"])
        .and_then(|row| row.latest())?;
    debug!("Free cash flow derived from operating cash flow and capex");
    Some(operating + capex)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcfValuation {
    pub projected_cash_flows: Vec<f64>,
    pub discounted_cash_flows: Vec<f64>,
    pub terminal_value: f64,
    pub discounted_terminal_value: f64,
    pub enterprise_value: f64,
    pub equity_value: f64,
    pub per_share_value: f64,
    /// Share count was unknown or zero and 1 was used instead.
    pub shares_assumed: bool,
}

/// Runs the model. Non-computable inputs come back as `InvalidAssumption`.
pub fn intrinsic_value(inputs: &DcfInputs) -> Result<DcfValuation, ValuationError> {
    inputs.validate()?;

    let g = inputs.growth_rate_5yr;
    let r = inputs.discount_rate;
    let tg = inputs.terminal_growth_rate;

    let projected_cash_flows: Vec<f64> = (1..=PROJECTION_PERIODS)
        .map(|i| inputs.latest_free_cash_flow * (1.0 + g).powi(i))
        .collect();

    let discounted_cash_flows: Vec<f64> = projected_cash_flows
        .iter()
        .zip(1..=PROJECTION_PERIODS)
        .map(|(cash, i)| cash / (1.0 + r).powi(i))
        .collect();

    let final_flow = projected_cash_flows[projected_cash_flows.len() - 1];
    let terminal_value = final_flow * (1.0 + tg) / (r - tg);
    let discounted_terminal_value = terminal_value / (1.0 + r).powi(PROJECTION_PERIODS);

    let enterprise_value = discounted_cash_flows.iter().sum::<f64>() + discounted_terminal_value;
    let equity_value = enterprise_value - inputs.total_debt + inputs.cash_and_equivalents;

    let (shares, shares_assumed) = match inputs.shares_outstanding {
        Some(s) if s.is_finite() && s != 0.0 => (s, false),
        _ => {
            warn!("Shares outstanding unknown; per-share DCF value uses a share count of 1");
            (1.0, true)
        }
    };

    Ok(DcfValuation {
        projected_cash_flows,
        discounted_cash_flows,
        terminal_value,
        discounted_terminal_value,
        enterprise_value,
        equity_value,
        per_share_value: equity_value / shares,
        shares_assumed,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DcfSignal {
    Undervalued,
    Overvalued,
}

/// Intrinsic value measured against the market price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DcfVerdict {
    pub signal: DcfSignal,
    /// (intrinsic - price) / price
    pub upside: f64,
}

impl DcfVerdict {
    pub fn against(per_share_value: f64, current_price: Option<f64>) -> Option<Self> {
        let price = current_price.filter(|p| p.is_finite() && *p > 0.0)?;
        let signal = if per_share_value > price {
            DcfSignal::Undervalued
        } else {
            DcfSignal::Overvalued
        };
        Some(Self {
            signal,
            upside: (per_share_value - price) / price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FinancialStatementRow, StatementKind};

    fn base_inputs() -> DcfInputs {
        DcfInputs {
            latest_free_cash_flow: 100.0,
            growth_rate_5yr: 0.10,
            terminal_growth_rate: 0.025,
            discount_rate: 0.09,
            total_debt: 0.0,
            cash_and_equivalents: 0.0,
            shares_outstanding: Some(100.0),
        }
    }

    #[test]
    fn matches_hand_computed_reference() {
        let valuation = intrinsic_value(&base_inputs()).expect("computable");
        // sum of 110/1.09 .. 161.051/1.09^5 plus terminal 2539.650/1.09^5
        assert!((valuation.enterprise_value - 2164.52946).abs() < 1e-3);
        assert!((valuation.per_share_value - 21.6452946).abs() < 1e-5);
        assert_eq!(valuation.projected_cash_flows.len(), 5);
        assert!(!valuation.shares_assumed);
    }

    #[test]
    fn equity_bridge_subtracts_debt_and_adds_cash() {
        let plain = intrinsic_value(&base_inputs()).expect("computable");
        let mut inputs = base_inputs();
        inputs.total_debt = 300.0;
        inputs.cash_and_equivalents = 100.0;
        let bridged = intrinsic_value(&inputs).expect("computable");
        assert!((plain.equity_value - bridged.equity_value - 200.0).abs() < 1e-9);
        assert_eq!(plain.enterprise_value, bridged.enterprise_value);
    }

    #[test]
    fn non_positive_cash_flow_is_not_computable() {
        for fcf in [0.0, -50.0] {
            let mut inputs = base_inputs();
            inputs.latest_free_cash_flow = fcf;
            assert!(matches!(
                intrinsic_value(&inputs),
                Err(ValuationError::InvalidAssumption(_))
            ));
        }
    }

    #[test]
    fn discount_rate_must_exceed_terminal_growth() {
        let mut inputs = base_inputs();
        inputs.discount_rate = 0.025;
        assert!(matches!(
            intrinsic_value(&inputs),
            Err(ValuationError::InvalidAssumption(_))
        ));
        inputs.discount_rate = 0.02;
        assert!(intrinsic_value(&inputs).is_err());
    }

    #[test]
    fn unknown_shares_default_to_one() {
        let mut inputs = base_inputs();
        inputs.shares_outstanding = Some(0.0);
        let valuation = intrinsic_value(&inputs).expect("computable");
        assert!(valuation.shares_assumed);
        assert_eq!(valuation.per_share_value, valuation.equity_value);
    }

    #[test]
    fn derives_inputs_from_filings() {
        let cash_flow = FinancialStatement::new(StatementKind::CashFlow)
            .with_row(FinancialStatementRow::new("Operating Cash Flow", [500.0, 400.0]))
            .with_row(FinancialStatementRow::new("Capital Expenditure", [-120.0, -100.0]));
        let balance = FinancialStatement::new(StatementKind::BalanceSheet)
            .with_row(FinancialStatementRow::new("Long Term Debt", [250.0]))
            .with_row(FinancialStatementRow::new("Cash And Cash Equivalents", [75.0]));
        let mut info = CompanyInfo::new("TEST");
        info.shares_outstanding = Some(10.0);
        let assumptions = DcfAssumptions {
            growth_rate_5yr: 0.10,
            terminal_growth_rate: 0.025,
            discount_rate: 0.09,
        };

        let inputs = DcfInputs::from_filings(
            Some(&cash_flow),
            Some(&balance),
            &info,
            assumptions,
            DcfOverrides::default(),
        )
        .expect("inputs");
        assert_eq!(inputs.latest_free_cash_flow, 380.0);
        assert_eq!(inputs.total_debt, 250.0);
        assert_eq!(inputs.cash_and_equivalents, 75.0);
        assert_eq!(inputs.shares_outstanding, Some(10.0));

        let overridden = DcfInputs::from_filings(
            Some(&cash_flow),
            None,
            &info,
            assumptions,
            DcfOverrides {
                free_cash_flow: Some(1.0),
                ..DcfOverrides::default()
            },
        )
        .expect("inputs");
        assert_eq!(overridden.latest_free_cash_flow, 1.0);
        assert_eq!(overridden.total_debt, 0.0);
    }

    #[test]
    fn missing_cash_flow_is_missing_data() {
        let info = CompanyInfo::new("TEST");
        let assumptions = DcfAssumptions {
            growth_rate_5yr: 0.1,
            terminal_growth_rate: 0.02,
            discount_rate: 0.08,
        };
        let err = DcfInputs::from_filings(None, None, &info, assumptions, DcfOverrides::default())
            .expect_err("no fcf");
        assert!(matches!(err, ValuationError::MissingData(_)));
    }

    #[test]
    fn verdict_compares_against_price() {
        let verdict = DcfVerdict::against(120.0, Some(100.0)).expect("priced");
        assert_eq!(verdict.signal, DcfSignal::Undervalued);
        assert!((verdict.upside - 0.2).abs() < 1e-12);
        assert_eq!(
            DcfVerdict::against(80.0, Some(100.0)).map(|v| v.signal),
            Some(DcfSignal::Overvalued)
        );
        assert!(DcfVerdict::against(80.0, Some(0.0)).is_none());
        assert!(DcfVerdict::against(80.0, None).is_none());
    }
}

// src/services/calculations.rs
use serde::Serialize;
use log::{debug, warn};
use crate::models::{FinancialStatement, FinancialStatementRow};

/// Compound annual growth between two positive values.
pub fn calculate_cagr(start_value: f64, end_value: f64, years: f64) -> Option<f64> {
    if start_value <= 0.0 || end_value <= 0.0 || years <= 0.0 {
        None
    } else {
        Some((end_value / start_value).powf(1.0 / years) - 1.0)
    }
}

/// Mean of the values that are present. `None` when nothing is present.
pub fn mean_defined(values: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    if defined.is_empty() {
        None
    } else {
        Some(defined.iter().sum::<f64>() / defined.len() as f64)
    }
}

/// Period-over-period growth for adjacent pairs of a most-recent-first series.
///
/// Pair `i` compares `values[i]` against the older `values[i + 1]`. At most
/// `max_pairs` pairs are examined; a pair with a missing value or a zero
/// prior value is skipped.
pub fn pairwise_growth(values: &[Option<f64>], max_pairs: usize) -> Vec<f64> {
    let pairs = values.len().saturating_sub(1).min(max_pairs);
    (0..pairs)
        .filter_map(|i| match (values[i], values[i + 1]) {
            (Some(current), Some(prev)) if prev != 0.0 => Some(current / prev - 1.0),
            _ => None,
        })
        .collect()
}

/// Debt-to-equity per balance-sheet period, most recent first.
pub fn debt_to_equity(balance_sheet: &FinancialStatement) -> Vec<Option<f64>> {
    let debt: Option<Vec<Option<f64>>> = match balance_sheet.row("Total Debt") {
        Some(row) => Some(row.values.clone()),
        None => match (balance_sheet.row("Long Term Debt"), balance_sheet.row("Current Debt")) {
            (Some(long), Some(current)) => Some(
                long.values
                    .iter()
                    .zip(current.values.iter())
                    .map(|(l, c)| Some((*l)? + (*c)?))
                    .collect(),
            ),
            _ => None,
        },
    };

    let equity = balance_sheet
        .first_row(&["Total Equity Gross Minority Interest", "Stockholders Equity"])
        .map(|row| row.values.clone());

    match (debt, equity) {
        (Some(debt), Some(equity)) => debt
            .iter()
            .zip(equity.iter())
            .map(|(d, e)| match (d, e) {
                (Some(d), Some(e)) if *e != 0.0 => Some(d / e),
                _ => None,
            })
            .collect(),
        _ => {
            debug!("Balance sheet lacks debt or equity rows; no debt-to-equity series");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialsSummary {
    pub debt_to_equity: Vec<Option<f64>>,
    pub revenue_cagr: Option<f64>,
    pub eps_cagr: Option<f64>,
}

/// CAGR across the oldest and newest reported periods of a row.
fn row_cagr(row: &FinancialStatementRow, metric_name: &'static str) -> Option<f64> {
    let reported: Vec<(usize, f64)> = row
        .values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();

    if reported.len() < 2 {
        warn!("Insufficient {} data points ({}) for CAGR calculation", metric_name, reported.len());
        return None;
    }

    // values are most-recent first, so the newest entry comes first
    let (newest_idx, newest) = reported[0];
    let (oldest_idx, oldest) = reported[reported.len() - 1];
    calculate_cagr(oldest, newest, (oldest_idx - newest_idx) as f64)
}

pub fn summarize_financials(
    income: Option<&FinancialStatement>,
    balance_sheet: Option<&FinancialStatement>,
) -> FinancialsSummary {
    let revenue_cagr = income
        .and_then(|s| s.row("Total Revenue"))
        .and_then(|row| row_cagr(row, "revenue"));
    let eps_cagr = income
        .and_then(|s| s.first_row(&["Diluted EPS", "Basic EPS"]))
        .and_then(|row| row_cagr(row, "EPS"));

    FinancialsSummary {
        debt_to_equity: balance_sheet.map(debt_to_equity).unwrap_or_default(),
        revenue_cagr,
        eps_cagr,
    }
}

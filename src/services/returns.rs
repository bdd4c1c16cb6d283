// src/services/returns.rs
use serde::Serialize;
use chrono::Datelike;
use chrono_tz::US::Eastern;

use crate::models::PriceHistory;

pub const ONE_WEEK_PERIODS: usize = 5;
pub const ONE_MONTH_PERIODS: usize = 21;
pub const ONE_YEAR_PERIODS: usize = 252;
pub const FIVE_YEAR_PERIODS: usize = 1260;
/// Slack allowed on the five-year window, since a "5y" history request
/// rarely returns exactly 1260 sessions.
pub const FIVE_YEAR_TOLERANCE: usize = 10;

/// Fractional price change over `periods` trading sessions.
///
/// Defined only when the series holds more than `periods` closes.
pub fn roi_over(closes: &[f64], periods: usize) -> Option<f64> {
    if closes.len() <= periods {
        return None;
    }
    let latest = closes[closes.len() - 1];
    let past = closes[closes.len() - 1 - periods];
    fractional_change(past, latest)
}

/// Like [`roi_over`], but accepts a series up to `tolerance` sessions short,
/// measuring from the earliest close in that case.
pub fn roi_with_tolerance(closes: &[f64], periods: usize, tolerance: usize) -> Option<f64> {
    if closes.len() <= periods.saturating_sub(tolerance) {
        return None;
    }
    let lookback = periods.min(closes.len() - 1);
    roi_over(closes, lookback)
}

fn fractional_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 || !from.is_finite() || !to.is_finite() {
        None
    } else {
        Some((to - from) / from)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoricalReturns {
    pub one_week: Option<f64>,
    pub one_month: Option<f64>,
    pub one_year: Option<f64>,
    pub ytd: Option<f64>,
    pub five_years: Option<f64>,
    pub all_time: Option<f64>,
}

/// Return since the open of the first session in the latest bar's calendar
/// year, using US/Eastern market dates.
pub fn year_to_date(history: &PriceHistory) -> Option<f64> {
    let last = history.bars.last()?;
    let year = last.ts.with_timezone(&Eastern).year();
    let first_of_year = history
        .bars
        .iter()
        .find(|bar| bar.ts.with_timezone(&Eastern).year() == year)?;
    fractional_change(first_of_year.open, last.close)
}

pub fn historical_returns(history: &PriceHistory) -> HistoricalReturns {
    let closes = history.closes();
    if closes.is_empty() {
        return HistoricalReturns::default();
    }

    HistoricalReturns {
        one_week: roi_over(&closes, ONE_WEEK_PERIODS),
        one_month: roi_over(&closes, ONE_MONTH_PERIODS),
        one_year: roi_over(&closes, ONE_YEAR_PERIODS),
        ytd: year_to_date(history),
        five_years: roi_over(&closes, FIVE_YEAR_PERIODS),
        all_time: fractional_change(closes[0], closes[closes.len() - 1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceBar;
    use chrono::{TimeZone, Utc};

    fn bar(y: i32, m: u32, d: u32, open: f64, close: f64) -> PriceBar {
        PriceBar {
            ts: Utc.with_ymd_and_hms(y, m, d, 14, 30, 0).unwrap(),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: None,
        }
    }

    #[test]
    fn roi_needs_more_than_n_periods() {
        let closes = [100.0, 110.0, 120.0];
        assert_eq!(roi_over(&closes, 3), None);
        assert_eq!(roi_over(&closes, 2), Some(0.2));
        assert_eq!(roi_over(&closes, 1), Some((120.0 - 110.0) / 110.0));
    }

    #[test]
    fn five_year_window_tolerates_short_history() {
        let mut closes = vec![50.0; 1255];
        closes.push(100.0);
        // 1256 closes: within tolerance, measured from the first close
        assert_eq!(roi_with_tolerance(&closes, FIVE_YEAR_PERIODS, FIVE_YEAR_TOLERANCE), Some(1.0));
        assert_eq!(roi_over(&closes, FIVE_YEAR_PERIODS), None);

        let short = vec![50.0; 1200];
        assert_eq!(roi_with_tolerance(&short, FIVE_YEAR_PERIODS, FIVE_YEAR_TOLERANCE), None);
    }

    #[test]
    fn ytd_uses_first_session_of_latest_year() {
        let history = PriceHistory::new(
            "TEST",
            vec![
                bar(2023, 12, 29, 90.0, 95.0),
                bar(2024, 1, 2, 100.0, 101.0),
                bar(2024, 3, 1, 110.0, 125.0),
            ],
        );
        assert_eq!(year_to_date(&history), Some(0.25));
    }

    #[test]
    fn short_history_leaves_windows_unset() {
        let history = PriceHistory::new(
            "TEST",
            vec![bar(2024, 1, 2, 100.0, 100.0), bar(2024, 1, 3, 100.0, 150.0)],
        );
        let returns = historical_returns(&history);
        assert_eq!(returns.one_week, None);
        assert_eq!(returns.one_year, None);
        assert_eq!(returns.all_time, Some(0.5));
        assert_eq!(returns.ytd, Some(0.5));

        assert_eq!(historical_returns(&PriceHistory::default()), HistoricalReturns::default());
    }
}

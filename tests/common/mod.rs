// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use stock_research_dashboard::models::{
    CompanyInfo, FinancialStatement, FinancialStatementRow, HistoryRange, PriceBar, PriceHistory,
    StatementKind,
};
use stock_research_dashboard::services::error::ProviderError;
use stock_research_dashboard::services::provider::{FinancialDataProvider, StaticProvider, TickerFixture};

/// `count` daily bars starting 2023-01-03, closing at `start`, `start + step`, ...
pub fn history(symbol: &str, count: usize, start: f64, step: f64) -> PriceHistory {
    let first = Utc.with_ymd_and_hms(2023, 1, 3, 15, 0, 0).unwrap();
    let bars = (0..count)
        .map(|i| {
            let close = start + step * i as f64;
            PriceBar {
                ts: first + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: Some(1_000),
            }
        })
        .collect();
    PriceHistory::new(symbol, bars)
}

/// A profitable technology company: EPS [4, 2, NaN, 1], FCF 100, 100 shares.
pub fn acme() -> TickerFixture {
    let mut info = CompanyInfo::new("ACME");
    info.sector = Some("Technology".to_string());
    info.industry = Some("Software - Application".to_string());
    info.current_price = Some(100.0);
    info.trailing_pe = Some(30.0);
    info.trailing_eps = Some(3.3);
    info.peg_ratio = Some(1.8);
    info.return_on_equity = Some(0.25);
    info.enterprise_to_ebitda = Some(20.0);
    info.shares_outstanding = Some(100.0);

    TickerFixture {
        info,
        statements: vec![
            FinancialStatement::new(StatementKind::Income)
                .with_row(FinancialStatementRow::new("Diluted EPS", [4.0, 2.0, f64::NAN, 1.0]))
                .with_row(FinancialStatementRow::new("Total Revenue", [400.0, 200.0, 150.0, 100.0])),
            FinancialStatement::new(StatementKind::CashFlow)
                .with_row(FinancialStatementRow::new("Free Cash Flow", [100.0, 80.0])),
            FinancialStatement::new(StatementKind::BalanceSheet)
                .with_row(FinancialStatementRow::new("Total Debt", [0.0, 10.0]))
                .with_row(FinancialStatementRow::new("Cash And Cash Equivalents", [0.0, 5.0]))
                .with_row(FinancialStatementRow::new("Stockholders Equity", [50.0, 40.0])),
        ],
        history: history("ACME", 300, 50.0, 0.5),
    }
}

/// A peer with market data only.
pub fn peer(symbol: &str, pe: f64) -> TickerFixture {
    let mut info = CompanyInfo::new(symbol);
    info.sector = Some("Technology".to_string());
    info.trailing_pe = Some(pe);
    info.enterprise_to_ebitda = Some(pe / 2.0);
    TickerFixture {
        info,
        statements: Vec::new(),
        history: history(symbol, 260, 100.0, 1.0),
    }
}

pub fn provider() -> StaticProvider {
    StaticProvider::new()
        .with_ticker(acme())
        .with_ticker(peer("MSFT", 35.0))
        .with_ticker(peer("AAPL", 28.0))
}

/// Provider whose upstream is down for every request.
pub struct OfflineProvider;

fn unavailable(symbol: &str) -> ProviderError {
    ProviderError::Status {
        status: 503,
        url: format!("https://example.invalid/{}", symbol),
    }
}

#[async_trait]
impl FinancialDataProvider for OfflineProvider {
    async fn company_info(&self, symbol: &str) -> Result<CompanyInfo, ProviderError> {
        Err(unavailable(symbol))
    }

    async fn statement(&self, symbol: &str, _kind: StatementKind) -> Result<FinancialStatement, ProviderError> {
        Err(unavailable(symbol))
    }

    async fn price_history(&self, symbol: &str, _range: HistoryRange) -> Result<PriceHistory, ProviderError> {
        Err(unavailable(symbol))
    }
}

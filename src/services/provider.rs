// src/services/provider.rs
//! Market-data provider contract.
//!
//! The valuation core never talks to the network itself. Handlers and the
//! peer comparator ask a [`FinancialDataProvider`] for company info, filings
//! tables and price history, then hand plain data to the pure calculators.

use async_trait::async_trait;
use std::collections::HashMap;
use log::debug;

use crate::models::{CompanyInfo, FinancialStatement, HistoryRange, PriceHistory, StatementKind};
use super::error::ProviderError;

#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Named scalar fields (price, trailing ratios, sector...).
    async fn company_info(&self, symbol: &str) -> Result<CompanyInfo, ProviderError>;

    /// One annual filings table, rows ordered most recent period first.
    async fn statement(&self, symbol: &str, kind: StatementKind) -> Result<FinancialStatement, ProviderError>;

    /// Daily bars, oldest first.
    async fn price_history(&self, symbol: &str, range: HistoryRange) -> Result<PriceHistory, ProviderError>;
}

/// Everything a [`StaticProvider`] knows about one symbol.
#[derive(Debug, Clone, Default)]
pub struct TickerFixture {
    pub info: CompanyInfo,
    pub statements: Vec<FinancialStatement>,
    pub history: PriceHistory,
}

/// Provider backed by in-memory snapshots. Unknown symbols are `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    tickers: HashMap<String, TickerFixture>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ticker(mut self, fixture: TickerFixture) -> Self {
        self.tickers.insert(fixture.info.symbol.to_ascii_uppercase(), fixture);
        self
    }

    fn fixture(&self, symbol: &str) -> Result<&TickerFixture, ProviderError> {
        self.tickers
            .get(&symbol.to_ascii_uppercase())
            .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))
    }
}

#[async_trait]
impl FinancialDataProvider for StaticProvider {
    async fn company_info(&self, symbol: &str) -> Result<CompanyInfo, ProviderError> {
        debug!("Static company info for {}", symbol);
        Ok(self.fixture(symbol)?.info.clone())
    }

    async fn statement(&self, symbol: &str, kind: StatementKind) -> Result<FinancialStatement, ProviderError> {
        self.fixture(symbol)?
            .statements
            .iter()
            .find(|s| s.kind == kind)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("{} {}", symbol, kind.as_str())))
    }

    async fn price_history(&self, symbol: &str, _range: HistoryRange) -> Result<PriceHistory, ProviderError> {
        Ok(self.fixture(symbol)?.history.clone())
    }
}

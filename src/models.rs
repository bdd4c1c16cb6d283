// src/models.rs
use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

/// Which of the three filings tables a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Income,
    BalanceSheet,
    CashFlow,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [
        StatementKind::Income,
        StatementKind::BalanceSheet,
        StatementKind::CashFlow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Income => "income",
            StatementKind::BalanceSheet => "balance_sheet",
            StatementKind::CashFlow => "cash_flow",
        }
    }
}

/// A named line item with annual period values, most recent first.
///
/// Periods the provider reported as missing (or NaN) are stored as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatementRow {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl FinancialStatementRow {
    /// Builds a row from raw provider floats; non-finite values become `None`.
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|v| if v.is_finite() { Some(v) } else { None })
                .collect(),
        }
    }

    pub fn from_options(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(|v| v.filter(|x| x.is_finite())).collect(),
        }
    }

    /// Value of the most recent period, if that period was reported.
    pub fn latest(&self) -> Option<f64> {
        self.values.first().copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One filings table (income statement, balance sheet or cash flow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatement {
    pub kind: StatementKind,
    pub rows: Vec<FinancialStatementRow>,
}

impl FinancialStatement {
    pub fn new(kind: StatementKind) -> Self {
        Self { kind, rows: Vec::new() }
    }

    pub fn with_row(mut self, row: FinancialStatementRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn row(&self, name: &str) -> Option<&FinancialStatementRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// First row present under any of `names`, in the order given.
    pub fn first_row(&self, names: &[&str]) -> Option<&FinancialStatementRow> {
        names.iter().find_map(|name| self.row(name))
    }

    pub fn latest(&self, name: &str) -> Option<f64> {
        self.row(name).and_then(FinancialStatementRow::latest)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(FinancialStatementRow::is_empty)
    }
}

/// Named scalar fields the provider reports for a ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub symbol: String,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub current_price: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub enterprise_to_ebitda: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub enterprise_to_revenue: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    pub dividend_yield: Option<f64>,
}

impl CompanyInfo {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub ts: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

/// Daily bars for one symbol, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
}

impl PriceHistory {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        Self { symbol: symbol.into(), bars }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// How much price history to request from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryRange {
    OneYear,
    FiveYears,
    Max,
}

impl HistoryRange {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryRange::OneYear => "1y",
            HistoryRange::FiveYears => "5y",
            HistoryRange::Max => "max",
        }
    }
}

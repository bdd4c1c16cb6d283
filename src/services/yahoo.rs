// src/services/yahoo.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{
    CompanyInfo, FinancialStatement, FinancialStatementRow, HistoryRange, PriceBar, PriceHistory,
    StatementKind,
};
use super::error::ProviderError;
use super::provider::FinancialDataProvider;

pub const DEFAULT_QUERY_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_TIMESERIES_URL: &str = "https://query2.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,financialData,assetProfile";
// Start of the fundamentals window (1985); Yahoo only returns the last few annual periods anyway.
const TIMESERIES_PERIOD_START: i64 = 493_590_046;

/// Fundamentals-timeseries keys and the statement row names they populate.
const STATEMENT_FIELDS: &[(StatementKind, &str, &str)] = &[
    (StatementKind::Income, "DilutedEPS", "Diluted EPS"),
    (StatementKind::Income, "BasicEPS", "Basic EPS"),
    (StatementKind::Income, "TotalRevenue", "Total Revenue"),
    (StatementKind::Income, "NetIncome", "Net Income"),
    (StatementKind::Income, "OperatingIncome", "Operating Income"),
    (StatementKind::Income, "EBITDA", "EBITDA"),
    (StatementKind::BalanceSheet, "TotalDebt", "Total Debt"),
    (StatementKind::BalanceSheet, "LongTermDebt", "Long Term Debt"),
    (StatementKind::BalanceSheet, "CurrentDebt", "Current Debt"),
    (StatementKind::BalanceSheet, "CashAndCashEquivalents", "Cash And Cash Equivalents"),
    (StatementKind::BalanceSheet, "StockholdersEquity", "Stockholders Equity"),
    (StatementKind::BalanceSheet, "TotalEquityGrossMinorityInterest", "Total Equity Gross Minority Interest"),
    (StatementKind::CashFlow, "FreeCashFlow", "Free Cash Flow"),
    (StatementKind::CashFlow, "OperatingCashFlow", "Operating Cash Flow"),
    (StatementKind::CashFlow, "CapitalExpenditure", "Capital Expenditure"),
];

/// Yahoo Finance backed provider.
///
/// Session cookies live in the client's jar; the crumb that has to accompany
/// quoteSummary requests is fetched lazily and cached until Yahoo rejects it.
pub struct YahooProvider {
    client: Client,
    query_url: String,
    timeseries_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooProvider {
    pub fn new(
        query_url: impl Into<String>,
        timeseries_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            query_url: query_url.into().trim_end_matches('/').to_string(),
            timeseries_url: timeseries_url.into().trim_end_matches('/').to_string(),
            crumb: Mutex::new(None),
        })
    }

    fn cached_crumb(&self) -> Option<String> {
        self.crumb
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store_crumb(&self, crumb: Option<String>) {
        *self.crumb.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = crumb;
    }

    async fn crumb(&self) -> Result<String, ProviderError> {
        if let Some(crumb) = self.cached_crumb() {
            return Ok(crumb);
        }

        info!("Refreshing Yahoo session crumb");
        // The cookie endpoint answers 404 but still sets the session cookie.
        if let Err(e) = self
            .client
            .get(COOKIE_URL)
            .header("referer", "https://finance.yahoo.com/")
            .send()
            .await
        {
            warn!("Failed to obtain Yahoo session cookie: {}", e);
        }

        let url = format!("{}/v1/test/getcrumb", self.query_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status { status: status.as_u16(), url });
        }

        let body = response.text().await?;
        let crumb = body.trim();
        if crumb.is_empty() || crumb.len() >= 100 || crumb.contains(' ') || crumb.contains('<') {
            return Err(ProviderError::Parse(format!("unexpected crumb payload from {}", url)));
        }

        self.store_crumb(Some(crumb.to_string()));
        Ok(crumb.to_string())
    }

    async fn get_text(&self, url: &str) -> Result<(StatusCode, String), ProviderError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Fetches a crumb-authenticated URL, retrying once with a fresh crumb
    /// when Yahoo rejects the cached one.
    async fn get_with_crumb(&self, base_url: &str) -> Result<String, ProviderError> {
        for attempt in 0..2 {
            let crumb = self.crumb().await?;
            let url = format!("{}&crumb={}", base_url, urlencoding::encode(&crumb));
            let (status, body) = self.get_text(&url).await?;

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                warn!("Yahoo rejected crumb (attempt {}), invalidating", attempt + 1);
                self.store_crumb(None);
                continue;
            }
            // A 404 still carries the quoteSummary error object.
            if !status.is_success() && status != StatusCode::NOT_FOUND {
                return Err(ProviderError::Status { status: status.as_u16(), url: base_url.to_string() });
            }
            return Ok(body);
        }

        Err(ProviderError::Status {
            status: StatusCode::UNAUTHORIZED.as_u16(),
            url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl FinancialDataProvider for YahooProvider {
    async fn company_info(&self, symbol: &str) -> Result<CompanyInfo, ProviderError> {
        let base_url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}",
            self.query_url,
            urlencoding::encode(symbol),
            SUMMARY_MODULES
        );
        let body = self.get_with_crumb(&base_url).await?;
        let info = parse_quote_summary(symbol, &body).map_err(|e| {
            error!("Failed to read company info for {}: {}", symbol, e);
            e
        })?;
        info!("Fetched company info for {}", symbol);
        Ok(info)
    }

    async fn statement(&self, symbol: &str, kind: StatementKind) -> Result<FinancialStatement, ProviderError> {
        let types: Vec<String> = STATEMENT_FIELDS
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, key, _)| format!("annual{}", key))
            .collect();

        let encoded = urlencoding::encode(symbol);
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}?symbol={}&type={}&period1={}&period2={}",
            self.timeseries_url,
            encoded,
            encoded,
            types.join(","),
            TIMESERIES_PERIOD_START,
            Utc::now().timestamp()
        );

        let (status, body) = self.get_text(&url).await?;
        if !status.is_success() {
            return Err(ProviderError::Status { status: status.as_u16(), url });
        }

        let statement = parse_timeseries(kind, &body)?;
        if statement.is_empty() {
            return Err(ProviderError::NotFound(format!("{} {}", symbol, kind.as_str())));
        }
        info!("Fetched {} statement for {} ({} rows)", kind.as_str(), symbol, statement.rows.len());
        Ok(statement)
    }

    async fn price_history(&self, symbol: &str, range: HistoryRange) -> Result<PriceHistory, ProviderError> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.query_url,
            urlencoding::encode(symbol),
            range.as_str()
        );

        let (status, body) = self.get_text(&url).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(ProviderError::Status { status: status.as_u16(), url });
        }

        let history = parse_chart(symbol, &body)?;
        info!("Fetched {} daily bars for {}", history.bars.len(), symbol);
        Ok(history)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

/// Yahoo error objects come back as `{"code": ..., "description": ...}` or null.
fn api_error(error: &Option<Value>) -> Option<String> {
    match error {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(
            map.get("description")
                .or_else(|| map.get("code"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        ),
        Some(other) => Some(other.to_string()),
    }
}

/// Parses a v8 chart payload. Sessions missing any OHLC value are skipped.
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceHistory, ProviderError> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(message) = api_error(&response.chart.error) {
        return Err(ProviderError::NotFound(format!("{}: {}", symbol, message)));
    }

    let result = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse(format!("chart for {} has no quote block", symbol)))?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let ohlc = (
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
        );
        let (Some(open), Some(high), Some(low), Some(close)) = ohlc else {
            continue;
        };
        let Some(ts) = DateTime::<Utc>::from_timestamp(ts, 0) else {
            warn!("Skipping bar with invalid timestamp {} for {}", ts, symbol);
            continue;
        };
        let volume = quote
            .volume
            .get(i)
            .copied()
            .flatten()
            .and_then(|v| u64::try_from(v).ok());

        bars.push(PriceBar { ts, open, high, low, close, volume });
    }

    Ok(PriceHistory::new(symbol.to_ascii_uppercase(), bars))
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryData,
}

#[derive(Debug, Deserialize)]
struct SummaryData {
    #[serde(default)]
    result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatisticsModule>,
    #[serde(default)]
    financial_data: Option<FinancialDataModule>,
    #[serde(default)]
    asset_profile: Option<AssetProfileModule>,
}

/// Numeric fields are wrapped as `{"raw": 1.23, "fmt": "1.23"}`, or `{}` when absent.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw).filter(|v| v.is_finite())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    regular_market_price: Option<RawValue>,
    #[serde(default)]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    #[serde(default, rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(default, rename = "priceToSalesTrailing12Months")]
    price_to_sales_trailing12_months: Option<RawValue>,
    #[serde(default)]
    dividend_yield: Option<RawValue>,
    #[serde(default)]
    beta: Option<RawValue>,
    #[serde(default)]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatisticsModule {
    #[serde(default)]
    trailing_eps: Option<RawValue>,
    #[serde(default)]
    peg_ratio: Option<RawValue>,
    #[serde(default)]
    enterprise_to_ebitda: Option<RawValue>,
    #[serde(default)]
    enterprise_to_revenue: Option<RawValue>,
    #[serde(default)]
    shares_outstanding: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    #[serde(default)]
    current_price: Option<RawValue>,
    #[serde(default)]
    return_on_equity: Option<RawValue>,
    #[serde(default)]
    revenue_growth: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetProfileModule {
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
}

/// Parses a v10 quoteSummary payload into [`CompanyInfo`].
pub fn parse_quote_summary(symbol: &str, body: &str) -> Result<CompanyInfo, ProviderError> {
    let response: SummaryResponse = serde_json::from_str(body)?;

    if let Some(message) = api_error(&response.quote_summary.error) {
        return Err(ProviderError::NotFound(format!("{}: {}", symbol, message)));
    }

    let result = response
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ProviderError::NotFound(symbol.to_string()))?;

    let price = result.price.unwrap_or_default();
    let detail = result.summary_detail.unwrap_or_default();
    let stats = result.default_key_statistics.unwrap_or_default();
    let financial = result.financial_data.unwrap_or_default();
    let profile = result.asset_profile.unwrap_or_default();

    Ok(CompanyInfo {
        symbol: price.symbol.unwrap_or_else(|| symbol.to_ascii_uppercase()),
        sector: profile.sector.filter(|s| !s.is_empty()),
        industry: profile.industry.filter(|s| !s.is_empty()),
        current_price: raw(&financial.current_price).or_else(|| raw(&price.regular_market_price)),
        trailing_pe: raw(&detail.trailing_pe),
        trailing_eps: raw(&stats.trailing_eps),
        peg_ratio: raw(&stats.peg_ratio),
        return_on_equity: raw(&financial.return_on_equity),
        enterprise_to_ebitda: raw(&stats.enterprise_to_ebitda),
        price_to_sales: raw(&detail.price_to_sales_trailing12_months),
        enterprise_to_revenue: raw(&stats.enterprise_to_revenue),
        revenue_growth: raw(&financial.revenue_growth),
        shares_outstanding: raw(&stats.shares_outstanding),
        market_cap: raw(&price.market_cap).or_else(|| raw(&detail.market_cap)),
        beta: raw(&detail.beta),
        dividend_yield: raw(&detail.dividend_yield),
    })
}

/// Parses a fundamentals-timeseries payload into one statement table.
///
/// Each series reports `(asOfDate, value)` points; rows are aligned on the
/// union of reported dates, most recent first, so a period one series skipped
/// shows up as a gap instead of shifting later values.
pub fn parse_timeseries(kind: StatementKind, body: &str) -> Result<FinancialStatement, ProviderError> {
    let payload: Value = serde_json::from_str(body)?;
    let results = payload
        .pointer("/timeseries/result")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Parse("timeseries payload has no result array".to_string()))?;

    let mut series: Vec<(&'static str, Vec<(String, f64)>)> = Vec::new();
    for result in results {
        let Some(type_key) = result.pointer("/meta/type/0").and_then(Value::as_str) else {
            continue;
        };
        let Some(field) = type_key.strip_prefix("annual") else {
            continue;
        };
        let Some(&(_, _, row_name)) = STATEMENT_FIELDS
            .iter()
            .find(|(k, key, _)| *k == kind && *key == field)
        else {
            debug!("Ignoring unmapped timeseries field {}", type_key);
            continue;
        };

        let points: Vec<(String, f64)> = result
            .get(type_key)
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let date = entry.get("asOfDate")?.as_str()?;
                        let value = entry.pointer("/reportedValue/raw")?.as_f64()?;
                        Some((date.to_string(), value))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if !points.is_empty() {
            series.push((row_name, points));
        }
    }

    let dates: BTreeSet<&str> = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|(d, _)| d.as_str()))
        .collect();
    let newest_first: Vec<&str> = dates.into_iter().rev().collect();

    let mut statement = FinancialStatement::new(kind);
    // Keep the field-table order so rows are stable across requests.
    for &(_, _, row_name) in STATEMENT_FIELDS.iter().filter(|(k, _, _)| *k == kind) {
        let Some((_, points)) = series.iter().find(|(name, _)| *name == row_name) else {
            continue;
        };
        let values = newest_first
            .iter()
            .map(|date| points.iter().find(|(d, _)| d.as_str() == *date).map(|(_, v)| *v))
            .collect();
        statement = statement.with_row(FinancialStatementRow::from_options(row_name, values));
    }

    Ok(statement)
}

// src/services/peers.rs
use serde::Serialize;
use futures::future::join_all;
use log::{info, warn};

use crate::models::{CompanyInfo, HistoryRange, PriceHistory};
use super::calculations::mean_defined;
use super::error::{ProviderError, ValuationError};
use super::provider::FinancialDataProvider;
use super::returns::{roi_over, roi_with_tolerance, FIVE_YEAR_PERIODS, FIVE_YEAR_TOLERANCE, ONE_YEAR_PERIODS};

pub const PEER_COUNT: usize = 5;
pub const UNKNOWN_INDUSTRY: &str = "Unknown Industry";

/// One sector's candidate peers and the symbol that replaces the main
/// ticker when it appears among them.
#[derive(Debug, Clone, Copy)]
pub struct SectorPeers {
    pub sector: &'static str,
    pub candidates: [&'static str; PEER_COUNT],
    pub filler: Option<&'static str>,
}

const SECTOR_PEERS: &[SectorPeers] = &[
    SectorPeers { sector: "Technology", candidates: ["MSFT", "AAPL", "NVDA", "GOOGL", "ORCL"], filler: Some("ADBE") },
    SectorPeers { sector: "Financial Services", candidates: ["JPM", "BAC", "WFC", "C", "GS"], filler: Some("MS") },
    SectorPeers { sector: "Healthcare", candidates: ["JNJ", "PFE", "LLY", "MRK", "ABBV"], filler: None },
    SectorPeers { sector: "Consumer Cyclical", candidates: ["AMZN", "TSLA", "HD", "MCD", "NKE"], filler: None },
    SectorPeers { sector: "Consumer Defensive", candidates: ["WMT", "PG", "KO", "PEP", "COST"], filler: None },
    SectorPeers { sector: "Energy", candidates: ["XOM", "CVX", "SHEL", "TTE", "BP"], filler: None },
    SectorPeers { sector: "Industrials", candidates: ["CAT", "HON", "UPS", "GE", "BA"], filler: None },
    SectorPeers { sector: "Communication Services", candidates: ["GOOG", "META", "NFLX", "DIS", "TMUS"], filler: None },
];

const GENERIC_CANDIDATES: [&str; PEER_COUNT] = ["SPY", "QQQ", "DIA", "IWM", "VTI"];
const GENERIC_FILLER: &str = "VOO";

/// Sector → competitor lookup table.
#[derive(Debug, Clone)]
pub struct CompetitorMap {
    sectors: Vec<SectorPeers>,
    generic: [&'static str; PEER_COUNT],
    generic_filler: &'static str,
}

impl Default for CompetitorMap {
    fn default() -> Self {
        Self {
            sectors: SECTOR_PEERS.to_vec(),
            generic: GENERIC_CANDIDATES,
            generic_filler: GENERIC_FILLER,
        }
    }
}

impl CompetitorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a sector entry.
    pub fn with_sector(mut self, peers: SectorPeers) -> Self {
        self.sectors.retain(|s| s.sector != peers.sector);
        self.sectors.push(peers);
        self
    }

    pub fn sector(&self, sector: &str) -> Option<&SectorPeers> {
        self.sectors.iter().find(|s| s.sector == sector)
    }

    /// Up to five peers for `ticker`. The main ticker never appears in its
    /// own list; when removed it is replaced by the sector filler, or the
    /// generic filler for sectors without one.
    pub fn competitors(&self, ticker: &str, sector: Option<&str>) -> Vec<String> {
        let entry = sector.and_then(|s| self.sector(s));
        let candidates = entry.map(|e| e.candidates).unwrap_or(self.generic);
        let filler = entry.and_then(|e| e.filler).unwrap_or(self.generic_filler);

        let ticker = ticker.to_ascii_uppercase();
        let mut peers: Vec<String> = candidates
            .iter()
            .filter(|c| **c != ticker)
            .map(|c| c.to_string())
            .collect();
        if peers.len() < candidates.len() {
            peers.push(filler.to_string());
        }
        peers.truncate(PEER_COUNT);
        peers
    }
}

/// Ratios a provider reports as zero carry no information.
fn defined(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != 0.0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub ticker: String,
    pub pe: Option<f64>,
    pub peg: Option<f64>,
    pub roe: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub ev_to_revenue: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub roi_1y: Option<f64>,
    pub roi_5y: Option<f64>,
}

impl ComparisonRow {
    pub fn from_snapshot(ticker: &str, info: &CompanyInfo, history: &PriceHistory) -> Self {
        let closes = history.closes();
        Self {
            ticker: ticker.to_string(),
            pe: defined(info.trailing_pe),
            peg: defined(info.peg_ratio),
            roe: defined(info.return_on_equity),
            ev_to_ebitda: defined(info.enterprise_to_ebitda),
            price_to_sales: defined(info.price_to_sales),
            ev_to_revenue: defined(info.enterprise_to_revenue),
            revenue_growth: defined(info.revenue_growth),
            roi_1y: roi_over(&closes, ONE_YEAR_PERIODS),
            roi_5y: roi_with_tolerance(&closes, FIVE_YEAR_PERIODS, FIVE_YEAR_TOLERANCE),
        }
    }
}

/// Column means over the rows that define each column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonAverages {
    pub pe: Option<f64>,
    pub peg: Option<f64>,
    pub roe: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub ev_to_revenue: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub roi_1y: Option<f64>,
    pub roi_5y: Option<f64>,
}

fn column_mean(rows: &[ComparisonRow], column: fn(&ComparisonRow) -> Option<f64>) -> Option<f64> {
    let values: Vec<Option<f64>> = rows.iter().map(column).collect();
    mean_defined(&values)
}

impl ComparisonAverages {
    pub fn from_rows(rows: &[ComparisonRow]) -> Self {
        Self {
            pe: column_mean(rows, |r| r.pe),
            peg: column_mean(rows, |r| r.peg),
            roe: column_mean(rows, |r| r.roe),
            ev_to_ebitda: column_mean(rows, |r| r.ev_to_ebitda),
            price_to_sales: column_mean(rows, |r| r.price_to_sales),
            ev_to_revenue: column_mean(rows, |r| r.ev_to_revenue),
            revenue_growth: column_mean(rows, |r| r.revenue_growth),
            roi_1y: column_mean(rows, |r| r.roi_1y),
            roi_5y: column_mean(rows, |r| r.roi_5y),
        }
    }
}

/// Which columns matter for the main ticker: revenue multiples for cash
/// burners, EV/EBITDA for everyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonFocus {
    Growth,
    Profitability,
}

impl ComparisonFocus {
    pub fn for_cash_burning(burning: bool) -> Self {
        if burning {
            ComparisonFocus::Growth
        } else {
            ComparisonFocus::Profitability
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            ComparisonFocus::Growth => &["price_to_sales", "ev_to_revenue", "revenue_growth"],
            ComparisonFocus::Profitability => &["ev_to_ebitda"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerComparison {
    pub ticker: String,
    pub competitors: Vec<String>,
    pub rows: Vec<ComparisonRow>,
    pub averages: ComparisonAverages,
}

async fn fetch_row(
    provider: &dyn FinancialDataProvider,
    ticker: &str,
) -> Result<ComparisonRow, ProviderError> {
    let (info, history) = futures::join!(
        provider.company_info(ticker),
        provider.price_history(ticker, HistoryRange::FiveYears)
    );
    Ok(ComparisonRow::from_snapshot(ticker, &info?, &history?))
}

/// Builds comparison rows for `main` followed by `competitors`, fetched
/// concurrently. Tickers whose data cannot be fetched are left out; rows keep
/// the order of the ticker list.
pub async fn compare(
    provider: &dyn FinancialDataProvider,
    main: &str,
    competitors: &[String],
) -> PeerComparison {
    let tickers: Vec<&str> = std::iter::once(main)
        .chain(competitors.iter().map(String::as_str))
        .collect();

    let results = join_all(tickers.iter().map(|t| fetch_row(provider, t))).await;

    let rows: Vec<ComparisonRow> = tickers
        .iter()
        .zip(results)
        .filter_map(|(ticker, result)| match result {
            Ok(row) => Some(row),
            Err(e) => {
                let e = ValuationError::upstream(*ticker, e);
                warn!("Omitting {} from peer comparison: {}", ticker, e);
                None
            }
        })
        .collect();

    info!("Peer comparison for {}: {} of {} tickers resolved", main, rows.len(), tickers.len());

    let averages = ComparisonAverages::from_rows(&rows);
    PeerComparison {
        ticker: main.to_string(),
        competitors: competitors.to_vec(),
        rows,
        averages,
    }
}

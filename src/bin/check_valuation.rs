use anyhow::{Context, Result};
use log::{error, info, warn};
use std::env;

use stock_research_dashboard::config::AppConfig;
use stock_research_dashboard::models::{HistoryRange, StatementKind};
use stock_research_dashboard::services::cash::classify_statements;
use stock_research_dashboard::services::dcf::{intrinsic_value, DcfInputs, DcfOverrides, DcfVerdict};
use stock_research_dashboard::services::peers::{compare, CompetitorMap};
use stock_research_dashboard::services::provider::FinancialDataProvider;
use stock_research_dashboard::services::returns::historical_returns;
use stock_research_dashboard::services::valuation::{resolve_valuation, PegBand, ValuationContext};
use stock_research_dashboard::services::verdict::MarketVerdict;
use stock_research_dashboard::services::yahoo::YahooProvider;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    let config = AppConfig::from_env()?;

    let ticker = env::args()
        .nth(1)
        .context("usage: check_valuation <TICKER>")?
        .to_ascii_uppercase();

    info!("Checking valuation pipeline for {}...", ticker);

    let provider = YahooProvider::new(
        config.yahoo_query_url.clone(),
        config.yahoo_timeseries_url.clone(),
        config.yahoo_timeout,
    )?;

    let info = provider
        .company_info(&ticker)
        .await
        .with_context(|| format!("company info unavailable for {}", ticker))?;
    info!("Sector: {:?}, industry: {:?}, price: {:?}", info.sector, info.industry, info.current_price);

    let income = provider.statement(&ticker, StatementKind::Income).await;
    let cash_flow = provider.statement(&ticker, StatementKind::CashFlow).await;
    let balance_sheet = provider.statement(&ticker, StatementKind::BalanceSheet).await;
    for (kind, result) in [("income", &income), ("cash flow", &cash_flow), ("balance sheet", &balance_sheet)] {
        match result {
            Ok(statement) => info!("{} statement: {} rows", kind, statement.rows.len()),
            Err(e) => warn!("{} statement unavailable: {}", kind, e),
        }
    }

    let valuation = resolve_valuation(&ValuationContext::new(&info, income.as_ref().ok().cloned()));
    info!("EPS: {:?}", valuation.eps);
    info!("P/E: {:?}", valuation.pe);
    info!("PEG: {:?} ({:?})", valuation.peg, valuation.peg.map(|p| PegBand::classify(p.value)));
    if let Some(diff) = valuation.pe_divergence() {
        warn!("Filings P/E differs from market P/E by {:.2}", diff);
    }

    let dcf = DcfInputs::from_filings(
        cash_flow.as_ref().ok(),
        balance_sheet.as_ref().ok(),
        &info,
        config.dcf_defaults,
        DcfOverrides::default(),
    )
    .and_then(|inputs| intrinsic_value(&inputs));
    match dcf {
        Ok(dcf) => {
            info!(
                "DCF: EV {:.0}, equity {:.0}, per share {:.2} (shares assumed: {})",
                dcf.enterprise_value, dcf.equity_value, dcf.per_share_value, dcf.shares_assumed
            );
            if let Some(verdict) = DcfVerdict::against(dcf.per_share_value, info.current_price) {
                info!("DCF verdict: {:?}, upside {:.1}%", verdict.signal, verdict.upside * 100.0);
            }
        }
        Err(e) => error!("DCF not computable: {}", e),
    }

    let position = classify_statements(cash_flow.as_ref(), balance_sheet.as_ref(), config.missing_fcf_policy);
    info!("Cash position: {:?}", position);

    match provider.price_history(&ticker, HistoryRange::Max).await {
        Ok(history) => {
            info!("Returns: {:?}", historical_returns(&history));
            info!("Verdict: {:?}", MarketVerdict::evaluate(&info, &history));
        }
        Err(e) => warn!("Price history unavailable: {}", e),
    }

    let competitors = CompetitorMap::default().competitors(&ticker, info.sector.as_deref());
    let comparison = compare(&provider, &ticker, &competitors).await;
    for row in &comparison.rows {
        info!("{:?}", row);
    }
    info!("Averages: {:?}", comparison.averages);

    Ok(())
}

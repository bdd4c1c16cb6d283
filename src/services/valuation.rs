// src/services/valuation.rs
//! P/E, EPS and PEG resolution.
//!
//! Each figure is resolved by walking an ordered chain of sources: the
//! company's own filings first, then the provider's market data. The first
//! source that yields a value wins and is recorded next to the value.

use serde::Serialize;
use log::debug;

use crate::models::{CompanyInfo, FinancialStatement, FinancialStatementRow};
use super::calculations::pairwise_growth;

/// Most growth pairs averaged for the filings PEG.
pub const MAX_GROWTH_PAIRS: usize = 5;

/// Market P/E gap above which a filings P/E is flagged as diverging.
pub const PE_DIVERGENCE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpsSource {
    FilingsDiluted,
    FilingsBasic,
    MarketData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeSource {
    FilingsCalculated,
    MarketData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PegSource {
    FilingsCalculated { periods: usize },
    MarketData,
}

/// A value paired with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Resolved<S> {
    pub value: f64,
    pub source: S,
}

impl<S> Resolved<S> {
    fn new(value: f64, source: S) -> Self {
        Self { value, source }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationResult {
    pub pe: Option<Resolved<PeSource>>,
    pub eps: Option<Resolved<EpsSource>>,
    pub peg: Option<Resolved<PegSource>>,
    /// Provider trailing P/E, kept for crosscheck.
    pub market_pe: Option<f64>,
    /// Provider trailing EPS, kept for crosscheck.
    pub market_eps: Option<f64>,
}

impl ValuationResult {
    /// Difference between the filings P/E and the market P/E when it exceeds
    /// [`PE_DIVERGENCE_THRESHOLD`].
    pub fn pe_divergence(&self) -> Option<f64> {
        let pe = self.pe.filter(|pe| pe.source == PeSource::FilingsCalculated)?;
        let market = self.market_pe?;
        let diff = pe.value - market;
        (diff.abs() > PE_DIVERGENCE_THRESHOLD).then_some(diff)
    }
}

/// Everything the resolver looks at. No clocks, no I/O.
#[derive(Debug, Clone, Default)]
pub struct ValuationContext {
    pub income: Option<FinancialStatement>,
    pub current_price: Option<f64>,
    pub market_pe: Option<f64>,
    pub market_eps: Option<f64>,
    pub market_peg: Option<f64>,
}

impl ValuationContext {
    pub fn new(info: &CompanyInfo, income: Option<FinancialStatement>) -> Self {
        Self {
            income,
            current_price: info.current_price,
            market_pe: info.trailing_pe,
            market_eps: info.trailing_eps,
            market_peg: info.peg_ratio,
        }
    }

    /// The EPS row that supplies the filings EPS: diluted, else basic.
    fn filings_eps_row(&self) -> Option<&FinancialStatementRow> {
        let income = self.income.as_ref()?;
        ["Diluted EPS", "Basic EPS"]
            .iter()
            .filter_map(|name| income.row(name))
            .find(|row| row.latest().is_some())
    }
}

type Strategy<T> = fn(&ValuationContext) -> Option<T>;

/// Tries each strategy in order and returns the first value produced.
fn first_resolved<T>(field: &'static str, chain: &[(&'static str, Strategy<T>)], ctx: &ValuationContext) -> Option<T> {
    for (name, strategy) in chain {
        if let Some(value) = strategy(ctx) {
            debug!("{} resolved from {}", field, name);
            return Some(value);
        }
        debug!("{} unavailable from {}", field, name);
    }
    None
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

// --- EPS strategies ---

pub fn eps_from_diluted(ctx: &ValuationContext) -> Option<Resolved<EpsSource>> {
    let row = ctx.income.as_ref()?.row("Diluted EPS")?;
    row.latest().map(|v| Resolved::new(v, EpsSource::FilingsDiluted))
}

pub fn eps_from_basic(ctx: &ValuationContext) -> Option<Resolved<EpsSource>> {
    let row = ctx.income.as_ref()?.row("Basic EPS")?;
    row.latest().map(|v| Resolved::new(v, EpsSource::FilingsBasic))
}

pub fn eps_from_market(ctx: &ValuationContext) -> Option<Resolved<EpsSource>> {
    finite(ctx.market_eps).map(|v| Resolved::new(v, EpsSource::MarketData))
}

const EPS_CHAIN: &[(&str, Strategy<Resolved<EpsSource>>)] = &[
    ("filings diluted EPS", eps_from_diluted),
    ("filings basic EPS", eps_from_basic),
    ("market trailing EPS", eps_from_market),
];

// --- P/E strategies ---

/// Latest filings EPS, diluted preferred.
fn filings_eps(ctx: &ValuationContext) -> Option<f64> {
    eps_from_diluted(ctx)
        .or_else(|| eps_from_basic(ctx))
        .map(|eps| eps.value)
}

pub fn pe_from_filings(ctx: &ValuationContext) -> Option<Resolved<PeSource>> {
    let eps = filings_eps(ctx).filter(|eps| *eps != 0.0)?;
    let price = finite(ctx.current_price)?;
    Some(Resolved::new(price / eps, PeSource::FilingsCalculated))
}

pub fn pe_from_market(ctx: &ValuationContext) -> Option<Resolved<PeSource>> {
    finite(ctx.market_pe).map(|v| Resolved::new(v, PeSource::MarketData))
}

const PE_CHAIN: &[(&str, Strategy<Resolved<PeSource>>)] = &[
    ("filings P/E", pe_from_filings),
    ("market trailing P/E", pe_from_market),
];

// --- PEG strategies ---

/// PEG from the average year-over-year growth of the filings EPS row.
///
/// Uses the same row that supplies the filings EPS and needs a P/E computed
/// from filings. Growth is expressed as a whole-number percentage.
pub fn peg_from_filings(ctx: &ValuationContext) -> Option<Resolved<PegSource>> {
    let row = ctx.filings_eps_row()?;
    let pe = pe_from_filings(ctx)?.value;

    let growths = pairwise_growth(&row.values, MAX_GROWTH_PAIRS);
    if growths.is_empty() {
        return None;
    }
    let avg_growth = growths.iter().sum::<f64>() / growths.len() as f64;
    if avg_growth == 0.0 {
        return None;
    }

    Some(Resolved::new(
        pe / (avg_growth * 100.0),
        PegSource::FilingsCalculated { periods: growths.len() },
    ))
}

pub fn peg_from_market(ctx: &ValuationContext) -> Option<Resolved<PegSource>> {
    finite(ctx.market_peg).map(|v| Resolved::new(v, PegSource::MarketData))
}

const PEG_CHAIN: &[(&str, Strategy<Resolved<PegSource>>)] = &[
    ("filings EPS growth", peg_from_filings),
    ("market PEG", peg_from_market),
];

/// Resolves every field independently. A missing source only moves that
/// field further down its chain.
pub fn resolve_valuation(ctx: &ValuationContext) -> ValuationResult {
    ValuationResult {
        pe: first_resolved("P/E", PE_CHAIN, ctx),
        eps: first_resolved("EPS", EPS_CHAIN, ctx),
        peg: first_resolved("PEG", PEG_CHAIN, ctx),
        market_pe: finite(ctx.market_pe),
        market_eps: finite(ctx.market_eps),
    }
}

/// Reading of a PEG ratio on the conventional bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PegBand {
    /// Shrinking earnings; PEG is not meaningful, use P/S instead.
    Negative,
    Undervalued,
    FairlyValued,
    QuiteHigh,
    Overvalued,
}

impl PegBand {
    pub fn classify(peg: f64) -> Self {
        if peg < 0.0 {
            PegBand::Negative
        } else if peg < 1.0 {
            PegBand::Undervalued
        } else if peg < 2.0 {
            PegBand::FairlyValued
        } else if peg < 3.0 {
            PegBand::QuiteHigh
        } else {
            PegBand::Overvalued
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatementKind;

    fn income_with(rows: Vec<FinancialStatementRow>) -> FinancialStatement {
        rows.into_iter()
            .fold(FinancialStatement::new(StatementKind::Income), |s, r| s.with_row(r))
    }

    fn context(income: Option<FinancialStatement>) -> ValuationContext {
        ValuationContext {
            income,
            current_price: Some(100.0),
            market_pe: Some(30.0),
            market_eps: Some(3.5),
            market_peg: Some(2.2),
        }
    }

    #[test]
    fn diluted_eps_wins_over_basic() {
        let ctx = context(Some(income_with(vec![
            FinancialStatementRow::new("Basic EPS", [5.5, 5.0]),
            FinancialStatementRow::new("Diluted EPS", [5.0, 4.0]),
        ])));
        let result = resolve_valuation(&ctx);
        assert_eq!(result.eps, Some(Resolved::new(5.0, EpsSource::FilingsDiluted)));
        assert_eq!(result.pe, Some(Resolved::new(20.0, PeSource::FilingsCalculated)));
        // growth 5/4 - 1 = 25% -> 20 / 25
        assert_eq!(
            result.peg,
            Some(Resolved::new(0.8, PegSource::FilingsCalculated { periods: 1 }))
        );
    }

    #[test]
    fn basic_eps_used_when_diluted_missing() {
        let ctx = context(Some(income_with(vec![FinancialStatementRow::new(
            "Basic EPS",
            [4.0],
        )])));
        let result = resolve_valuation(&ctx);
        assert_eq!(result.eps.map(|e| e.source), Some(EpsSource::FilingsBasic));
        assert_eq!(result.pe.map(|p| p.value), Some(25.0));
        // a single period has no growth pair, so PEG falls back to the market
        assert_eq!(result.peg, Some(Resolved::new(2.2, PegSource::MarketData)));
    }

    #[test]
    fn falls_back_to_market_without_filings() {
        let result = resolve_valuation(&context(None));
        assert_eq!(result.eps, Some(Resolved::new(3.5, EpsSource::MarketData)));
        assert_eq!(result.pe, Some(Resolved::new(30.0, PeSource::MarketData)));
        assert_eq!(result.peg, Some(Resolved::new(2.2, PegSource::MarketData)));
    }

    #[test]
    fn unavailable_everywhere_stays_unset() {
        let result = resolve_valuation(&ValuationContext::default());
        assert!(result.pe.is_none());
        assert!(result.eps.is_none());
        assert!(result.peg.is_none());
        assert!(result.market_pe.is_none());
    }

    #[test]
    fn missing_price_keeps_filings_eps_but_uses_market_pe() {
        let mut ctx = context(Some(income_with(vec![FinancialStatementRow::new(
            "Diluted EPS",
            [4.0, 2.0],
        )])));
        ctx.current_price = None;
        let result = resolve_valuation(&ctx);
        assert_eq!(result.eps.map(|e| e.source), Some(EpsSource::FilingsDiluted));
        assert_eq!(result.pe.map(|p| p.source), Some(PeSource::MarketData));
        assert_eq!(result.peg.map(|p| p.source), Some(PegSource::MarketData));
    }

    #[test]
    fn nan_pairs_are_skipped_in_growth_average() {
        let ctx = context(Some(income_with(vec![FinancialStatementRow::new(
            "Diluted EPS",
            [4.0, 2.0, f64::NAN, 1.0],
        )])));
        let peg = peg_from_filings(&ctx).expect("filings peg");
        assert_eq!(peg.source, PegSource::FilingsCalculated { periods: 1 });
        // P/E 25, growth 100% -> 0.25
        assert!((peg.value - 0.25).abs() < 1e-12);
    }

    #[test]
    fn zero_average_growth_defers_to_market() {
        let ctx = context(Some(income_with(vec![FinancialStatementRow::new(
            "Diluted EPS",
            [2.0, 2.0, 2.0],
        )])));
        assert!(peg_from_filings(&ctx).is_none());
        assert_eq!(
            resolve_valuation(&ctx).peg.map(|p| p.source),
            Some(PegSource::MarketData)
        );
    }

    #[test]
    fn divergence_only_flags_filings_pe() {
        let ctx = context(Some(income_with(vec![FinancialStatementRow::new(
            "Diluted EPS",
            [4.0],
        )])));
        let result = resolve_valuation(&ctx);
        assert_eq!(result.pe_divergence(), Some(-5.0));

        let market_only = resolve_valuation(&context(None));
        assert_eq!(market_only.pe_divergence(), None);
    }

    #[test]
    fn peg_bands() {
        assert_eq!(PegBand::classify(-0.3), PegBand::Negative);
        assert_eq!(PegBand::classify(0.8), PegBand::Undervalued);
        assert_eq!(PegBand::classify(1.0), PegBand::FairlyValued);
        assert_eq!(PegBand::classify(2.5), PegBand::QuiteHigh);
        assert_eq!(PegBand::classify(3.0), PegBand::Overvalued);
    }
}

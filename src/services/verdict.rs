// src/services/verdict.rs
use serde::Serialize;
use log::debug;

use crate::models::{CompanyInfo, PriceHistory};

/// Sessions in the moving average the momentum check compares against.
pub const MOMENTUM_WINDOW: usize = 50;

const CHEAP_PE: f64 = 15.0;
const EXPENSIVE_PE: f64 = 50.0;

/// Where the market P/E sits. Both edges count as fair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeBand {
    Value,
    Fair,
    Expensive,
}

impl PeBand {
    pub fn classify(pe: f64) -> Self {
        if pe < CHEAP_PE {
            PeBand::Value
        } else if pe > EXPENSIVE_PE {
            PeBand::Expensive
        } else {
            PeBand::Fair
        }
    }

    pub fn score(self) -> f64 {
        match self {
            PeBand::Value => 1.0,
            PeBand::Fair => 0.0,
            PeBand::Expensive => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Momentum {
    AboveMa50,
    /// Also used when the last close equals the average.
    BelowMa50,
}

impl Momentum {
    pub fn score(self) -> f64 {
        match self {
            Momentum::AboveMa50 => 1.0,
            Momentum::BelowMa50 => -1.0,
        }
    }
}

/// Mean of the last `window` closes, or of all of them when fewer exist.
pub fn moving_average(closes: &[f64], window: usize) -> Option<f64> {
    if closes.is_empty() || window == 0 {
        return None;
    }
    let tail = &closes[closes.len().saturating_sub(window)..];
    Some(tail.iter().sum::<f64>() / tail.len() as f64)
}

/// Quick market read combining the P/E band with 50-day momentum.
/// The score runs from -2 to +2.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketVerdict {
    pub pe_band: Option<PeBand>,
    pub momentum: Option<Momentum>,
    pub ma50: Option<f64>,
    pub sentiment_score: f64,
}

impl MarketVerdict {
    pub fn evaluate(info: &CompanyInfo, history: &PriceHistory) -> Self {
        let pe_band = info.trailing_pe.filter(|pe| pe.is_finite()).map(PeBand::classify);

        let closes = history.closes();
        let ma50 = moving_average(&closes, MOMENTUM_WINDOW).filter(|ma| ma.is_finite());
        let momentum = match (closes.last(), ma50) {
            (Some(&last), Some(ma)) if last.is_finite() => Some(if last > ma {
                Momentum::AboveMa50
            } else {
                Momentum::BelowMa50
            }),
            _ => None,
        };

        let sentiment_score = pe_band.map_or(0.0, PeBand::score) + momentum.map_or(0.0, Momentum::score);
        debug!(
            "Verdict for {}: pe band {:?}, momentum {:?}, score {}",
            info.symbol, pe_band, momentum, sentiment_score
        );

        MarketVerdict {
            pe_band,
            momentum,
            ma50,
            sentiment_score,
        }
    }
}

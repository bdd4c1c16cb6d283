// src/services/error.rs
use thiserror::Error;

/// Failure talking to the market-data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed to parse provider payload: {0}")]
    Parse(String),

    #[error("no data for symbol {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::Parse(e.to_string())
    }
}

/// Outcome taxonomy of the valuation core.
#[derive(Debug, Error)]
pub enum ValuationError {
    /// A required field or statement is absent.
    #[error("missing data: {0}")]
    MissingData(String),

    /// Calculator input the model is not defined for.
    #[error("invalid assumption: {0}")]
    InvalidAssumption(String),

    /// The provider could not be reached for the ticker at all.
    #[error("upstream unavailable for {symbol}: {source}")]
    UpstreamUnavailable {
        symbol: String,
        #[source]
        source: ProviderError,
    },
}

impl ValuationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ValuationError::InvalidAssumption(message.into())
    }

    pub fn missing(message: impl Into<String>) -> Self {
        ValuationError::MissingData(message.into())
    }

    pub fn upstream(symbol: impl Into<String>, source: ProviderError) -> Self {
        ValuationError::UpstreamUnavailable {
            symbol: symbol.into(),
            source,
        }
    }
}

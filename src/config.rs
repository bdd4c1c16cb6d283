// src/config.rs
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::cash::MissingCashFlowPolicy;
use crate::services::dcf::DcfAssumptions;
use crate::services::yahoo::{DEFAULT_QUERY_URL, DEFAULT_TIMESERIES_URL};

pub const DEFAULT_PORT: u16 = 3030;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub yahoo_query_url: String,
    pub yahoo_timeseries_url: String,
    pub yahoo_timeout: Duration,
    /// DCF rates used when a request leaves them out, as fractions.
    pub dcf_defaults: DcfAssumptions,
    pub missing_fcf_policy: MissingCashFlowPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            yahoo_query_url: DEFAULT_QUERY_URL.to_string(),
            yahoo_timeseries_url: DEFAULT_TIMESERIES_URL.to_string(),
            yahoo_timeout: Duration::from_secs(10),
            dcf_defaults: DcfAssumptions {
                growth_rate_5yr: 0.10,
                terminal_growth_rate: 0.025,
                discount_rate: 0.09,
            },
            missing_fcf_policy: MissingCashFlowPolicy::AssumeBurning,
        }
    }
}

impl FromStr for MissingCashFlowPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assume_burning" => Ok(MissingCashFlowPolicy::AssumeBurning),
            "unknown" => Ok(MissingCashFlowPolicy::Unknown),
            other => bail!("unknown missing cash flow policy '{}'", other),
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(None),
    }
}

impl AppConfig {
    /// Reads configuration from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup. Unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = match parse_var::<u16>(&lookup, "PORT")? {
            Some(port) => port,
            None => {
                warn!("$PORT not set, defaulting to {}", DEFAULT_PORT);
                DEFAULT_PORT
            }
        };

        let percent = |key: &str, default: f64| -> Result<f64> {
            Ok(parse_var::<f64>(&lookup, key)?.map(|p| p / 100.0).unwrap_or(default))
        };
        let dcf_defaults = DcfAssumptions {
            growth_rate_5yr: percent("DCF_DEFAULT_GROWTH_PCT", defaults.dcf_defaults.growth_rate_5yr)?,
            terminal_growth_rate: percent("DCF_DEFAULT_TERMINAL_PCT", defaults.dcf_defaults.terminal_growth_rate)?,
            discount_rate: percent("DCF_DEFAULT_WACC_PCT", defaults.dcf_defaults.discount_rate)?,
        };
        if dcf_defaults.discount_rate <= dcf_defaults.terminal_growth_rate {
            bail!("DCF_DEFAULT_WACC_PCT must exceed DCF_DEFAULT_TERMINAL_PCT");
        }

        let yahoo_timeout = parse_var::<u64>(&lookup, "YAHOO_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.yahoo_timeout);

        let config = Self {
            port,
            yahoo_query_url: lookup("YAHOO_QUERY_URL").unwrap_or(defaults.yahoo_query_url),
            yahoo_timeseries_url: lookup("YAHOO_TIMESERIES_URL").unwrap_or(defaults.yahoo_timeseries_url),
            yahoo_timeout,
            dcf_defaults,
            missing_fcf_policy: parse_var(&lookup, "MISSING_FCF_POLICY")?
                .unwrap_or(defaults.missing_fcf_policy),
        };
        info!("Configuration loaded: {:?}", config);
        Ok(config)
    }
}

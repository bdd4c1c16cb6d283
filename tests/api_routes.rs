// tests/api_routes.rs
mod common;

use serde_json::Value;
use std::sync::Arc;
use warp::http::StatusCode;

use stock_research_dashboard::config::AppConfig;
use stock_research_dashboard::routes::routes;
use stock_research_dashboard::services::provider::FinancialDataProvider;

async fn get(provider: Arc<dyn FinancialDataProvider>, path: &str) -> (StatusCode, Value) {
    let api = routes(provider, Arc::new(AppConfig::default()));
    let res = warp::test::request().method("GET").path(path).reply(&api).await;
    let body = serde_json::from_slice(res.body()).expect("JSON body");
    (res.status(), body)
}

fn static_provider() -> Arc<dyn FinancialDataProvider> {
    Arc::new(common::provider())
}

#[tokio::test]
async fn valuation_reports_sources() {
    let (status, body) = get(static_provider(), "/api/v1/valuation/acme").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticker"], "ACME");
    assert_eq!(body["eps"]["value"], 4.0);
    assert_eq!(body["eps"]["source"], "filings_diluted");
    assert_eq!(body["pe"]["value"], 25.0);
    assert_eq!(body["pe"]["source"], "filings_calculated");
    assert_eq!(body["peg"]["source"]["kind"], "filings_calculated");
    assert_eq!(body["peg"]["source"]["periods"], 1);
    assert_eq!(body["peg_band"], "undervalued");
    assert_eq!(body["pe_divergence"], -5.0);
    assert_eq!(body["market_pe"], 30.0);
    assert_eq!(body["verdict"]["pe_band"], "fair");
    assert_eq!(body["verdict"]["momentum"], "above_ma50");
    assert_eq!(body["verdict"]["sentiment_score"], 1.0);
}

#[tokio::test]
async fn dcf_uses_configured_defaults() {
    let (status, body) = get(static_provider(), "/api/v1/dcf/ACME").await;
    assert_eq!(status, StatusCode::OK);
    let per_share = body["valuation"]["per_share_value"].as_f64().unwrap();
    assert!((per_share - 21.6452946).abs() < 1e-6);
    assert_eq!(body["inputs"]["discount_rate"], 0.09);
    assert_eq!(body["valuation"]["shares_assumed"], false);
    assert_eq!(body["verdict"]["signal"], "overvalued");
}

#[tokio::test]
async fn dcf_query_overrides_filings() {
    let (status, body) = get(static_provider(), "/api/v1/dcf/ACME?fcf=200&growth=10&terminal=2.5&wacc=9").await;
    assert_eq!(status, StatusCode::OK);
    let per_share = body["valuation"]["per_share_value"].as_f64().unwrap();
    assert!((per_share - 2.0 * 21.6452946).abs() < 1e-6);
}

#[tokio::test]
async fn dcf_invalid_assumptions_are_unprocessable() {
    let (status, body) = get(static_provider(), "/api/v1/dcf/ACME?wacc=2").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("discount rate"));

    let (status, _) = get(static_provider(), "/api/v1/dcf/ACME?fcf=-50").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(static_provider(), "/api/v1/dcf/ACME?wacc=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cash_position_for_profitable_company() {
    let (status, body) = get(static_provider(), "/api/v1/cash/ACME").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cash_stable");
    assert!(body["runway_months"].is_null());
}

#[tokio::test]
async fn cash_position_unknown_without_statements() {
    let (status, body) = get(static_provider(), "/api/v1/cash/MSFT").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "unknown");
    assert_eq!(body["burn_assumed"], false);
}

#[tokio::test]
async fn cash_position_requires_a_known_ticker() {
    let (status, _) = get(static_provider(), "/api/v1/cash/NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(Arc::new(common::OfflineProvider), "/api/v1/cash/ACME").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("ACME"));
}

#[tokio::test]
async fn peers_omit_unavailable_tickers() {
    let (status, body) = get(static_provider(), "/api/v1/peers/ACME").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["industry"], "Software - Application");
    assert_eq!(body["focus"], "profitability");
    assert_eq!(body["competitors"].as_array().unwrap().len(), 5);

    let rows: Vec<&str> = body["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["ticker"].as_str().unwrap())
        .collect();
    assert_eq!(rows, vec!["ACME", "MSFT", "AAPL"]);
    assert!(body["averages"]["peg"].as_f64().is_some());
}

#[tokio::test]
async fn returns_cover_available_windows() {
    let (status, body) = get(static_provider(), "/api/v1/returns/ACME").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"], 300);
    assert!(body["returns"]["one_year"].as_f64().is_some());
    assert!(body["returns"]["five_years"].is_null());
}

#[tokio::test]
async fn financials_include_summary() {
    let (status, body) = get(static_provider(), "/api/v1/financials/ACME").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statements"].as_array().unwrap().len(), 3);
    assert_eq!(body["summary"]["debt_to_equity"][0], 0.0);
    let revenue_cagr = body["summary"]["revenue_cagr"].as_f64().unwrap();
    assert!((revenue_cagr - (4.0_f64.powf(1.0 / 3.0) - 1.0)).abs() < 1e-12);
}

#[tokio::test]
async fn error_statuses() {
    let (status, body) = get(static_provider(), "/api/v1/valuation/bad%20ticker").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = get(static_provider(), "/api/v1/valuation/NOPE").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(Arc::new(common::OfflineProvider), "/api/v1/valuation/ACME").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("ACME"));

    let (status, body) = get(static_provider(), "/api/v1/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}

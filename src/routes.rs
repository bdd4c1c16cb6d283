// src/routes.rs
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::{Filter, Reply};
use log::{error, info};

use crate::config::AppConfig;
use crate::handlers::{
    cash::get_cash_position, dcf::get_dcf, dcf::DcfQuery, financials::get_financials,
    peers::get_peers, returns::get_returns, valuation::get_valuation,
};
use crate::handlers::error::ApiError;
use crate::services::provider::FinancialDataProvider;

// Add recovery handling for our custom errors
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status();
        message = api_error.message.clone();
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        code = StatusCode::BAD_REQUEST;
        message = e.to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method Not Allowed".to_string();
    } else {
        error!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(
    provider: Arc<dyn FinancialDataProvider>,
    config: Arc<AppConfig>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let provider_filter = warp::any().map(move || provider.clone());
    let config_filter = warp::any().map(move || config.clone());

    let valuation_route = warp::path!("api" / "v1" / "valuation" / String)
        .and(warp::get())
        .and(provider_filter.clone())
        .and_then(get_valuation);

    let dcf_route = warp::path!("api" / "v1" / "dcf" / String)
        .and(warp::get())
        .and(warp::query::<DcfQuery>())
        .and(provider_filter.clone())
        .and(config_filter.clone())
        .and_then(get_dcf);

    let cash_route = warp::path!("api" / "v1" / "cash" / String)
        .and(warp::get())
        .and(provider_filter.clone())
        .and(config_filter.clone())
        .and_then(get_cash_position);

    let peers_route = warp::path!("api" / "v1" / "peers" / String)
        .and(warp::get())
        .and(provider_filter.clone())
        .and(config_filter.clone())
        .and_then(get_peers);

    let returns_route = warp::path!("api" / "v1" / "returns" / String)
        .and(warp::get())
        .and(provider_filter.clone())
        .and_then(get_returns);

    let financials_route = warp::path!("api" / "v1" / "financials" / String)
        .and(warp::get())
        .and(provider_filter.clone())
        .and_then(get_financials);

    info!("All routes configured successfully.");

    valuation_route
        .or(dcf_route)
        .or(cash_route)
        .or(peers_route)
        .or(returns_route)
        .or(financials_route)
        .recover(handle_rejection)
}

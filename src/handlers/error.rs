// src/handlers/error.rs
use std::fmt;
use warp::http::StatusCode;
use warp::reject::Reject;

use crate::services::error::{ProviderError, ValuationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    InvalidInput,
    InvalidAssumption,
    Upstream,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidInput, message)
    }

    pub fn upstream(symbol: &str, source: ProviderError) -> Self {
        ValuationError::upstream(symbol, source).into()
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ApiErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ApiErrorKind::InvalidAssumption => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ApiErrorKind::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl From<ValuationError> for ApiError {
    fn from(e: ValuationError) -> Self {
        let kind = match &e {
            ValuationError::InvalidAssumption(_) => ApiErrorKind::InvalidAssumption,
            ValuationError::MissingData(_) => ApiErrorKind::InvalidAssumption,
            ValuationError::UpstreamUnavailable { source: ProviderError::NotFound(_), .. } => {
                ApiErrorKind::NotFound
            }
            ValuationError::UpstreamUnavailable { .. } => ApiErrorKind::Upstream,
        };
        Self::new(kind, e.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
impl Reject for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_valuation_errors_to_status() {
        let err: ApiError = ValuationError::invalid("discount rate too low").into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::upstream("ACME", ProviderError::Parse("bad json".into()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.message.contains("ACME"));

        let err = ApiError::upstream("NOPE", ProviderError::NotFound("NOPE".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        assert_eq!(ApiError::invalid_input("bad ticker").status(), StatusCode::BAD_REQUEST);
    }
}

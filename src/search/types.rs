use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::upstream::UpstreamError;
use crate::auth::Unauthenticated;
use super::validate::FieldViolation;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(error: &'static str) -> Self {
        Self {
            error,
            details: None,
            message: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search parameters")]
    InvalidParameters(Vec<FieldViolation>),
    #[error("Unauthorized")]
    Unauthenticated,
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("Method not allowed")]
    UnsupportedMethod,
}

impl SearchError {
    pub fn status(&self) -> StatusCode {
        match self {
            SearchError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            SearchError::Unauthenticated => StatusCode::UNAUTHORIZED,
            SearchError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SearchError::UnsupportedMethod => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Render the error. Upstream detail is only included when `development` is set.
    pub fn into_reply(self, development: bool) -> Response {
        let status = self.status();
        let body = match self {
            SearchError::InvalidParameters(details) => ErrorBody {
                details: Some(details),
                ..ErrorBody::new("Invalid search parameters")
            },
            SearchError::Unauthenticated => ErrorBody::new("Unauthorized"),
            SearchError::Upstream(e) => ErrorBody {
                message: development.then(|| e.to_string()),
                ..ErrorBody::new("Internal server error")
            },
            SearchError::UnsupportedMethod => ErrorBody::new("Method not allowed"),
        };

        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

impl From<Unauthenticated> for SearchError {
    fn from(_: Unauthenticated) -> Self {
        SearchError::Unauthenticated
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        self.into_reply(false)
    }
}

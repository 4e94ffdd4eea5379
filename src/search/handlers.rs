use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};

use super::cache::directive_for;
use super::types::SearchError;
use super::upstream::{SearchResponse, UpstreamQuery};
use super::validate::RawSearchParams;
use crate::auth::authenticate;
use crate::server::AppState;

pub async fn search_movies(
    State(state): State<AppState>,
    method: Method,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    if method != Method::GET {
        debug!(%method, "Search request with unsupported method");
        return SearchError::UnsupportedMethod.into_reply(state.config.development);
    }

    let params = RawSearchParams::from_pairs(pairs);

    match run_search(&state, &params, &headers).await {
        Ok(payload) => {
            let directive = directive_for(state.config.cache.ttl);
            (
                [(header::CACHE_CONTROL, directive.to_string())],
                Json(payload.into_raw()),
            )
                .into_response()
        }
        Err(e) => e.into_reply(state.config.development),
    }
}

/// Validate, authenticate, then proxy. Each step only runs if the
/// previous one succeeded, so invalid or anonymous requests never
/// reach the upstream service.
pub async fn run_search(
    state: &AppState,
    params: &RawSearchParams,
    headers: &HeaderMap,
) -> Result<SearchResponse, SearchError> {
    let request = params.validate().map_err(|violations| {
        debug!(violations = violations.len(), "Invalid search parameters");
        SearchError::InvalidParameters(violations)
    })?;

    let session = authenticate(state.sessions.as_ref(), headers)
        .await
        .inspect_err(|_| debug!("Search request without a valid session"))?;

    let query = UpstreamQuery::from(&request);
    let payload = state
        .upstream
        .fetch_search(&query, &session)
        .await
        .inspect_err(|e| error!(error = %e, q = %query.q, "Movie search error"))?;

    Ok(payload)
}

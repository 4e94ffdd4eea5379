use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::auth::{JwtSessionResolver, SessionResolver};
use crate::config::Config;
use crate::search::{ErrorBody, HttpUpstreamClient, UpstreamClient};
use crate::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<dyn SessionResolver>,
    pub upstream: Arc<dyn UpstreamClient>,
}

impl AppState {
    pub fn new(
        config: Config,
        sessions: Arc<dyn SessionResolver>,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            upstream,
        }
    }

    /// Build the JWT session resolver and HTTP upstream client from a
    /// validated config.
    pub fn from_config(config: Config) -> Result<Self, ServerError> {
        config.validate()?;

        let base_url = config.upstream.baseurl.as_deref().unwrap_or_default();
        let secret = config.session.secret.as_deref().unwrap_or_default();

        let upstream = HttpUpstreamClient::new(base_url, Duration::from_secs(config.upstream.timeout))
            .map_err(|e| ServerError::Server(format!("Failed to create upstream client: {}", e)))?
            .with_max_body(config.upstream.max_body);
        let sessions = JwtSessionResolver::new(secret, config.session.cookies.clone());

        Ok(Self::new(config, Arc::new(sessions), Arc::new(upstream)))
    }
}

pub fn build_router(state: AppState) -> Router {
    // Every verb reaches the handler, which only accepts GET.
    let search = any(crate::search::search_movies);

    Router::new()
        .route("/api/movies", search.clone())
        .route("/api/movies/search", search)
        .route("/api/health", get(health_handler))
        .fallback(fallback_handler)
        .layer(axum::middleware::from_fn(crate::middleware::security_headers))
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(axum::middleware::from_fn(crate::middleware::cors))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

async fn health_handler() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn fallback_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn app() -> Router {
        let mut config = Config::default();
        config.upstream.baseurl = Some("http://127.0.0.1:9".to_string());
        config.session.secret = Some("secret".to_string());
        build_router(AppState::from_config(config).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = app()
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_options_on_unknown_path_is_not_found() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/movies/search")
                    .header("origin", "https://movies.example")
                    .header("access-control-request-method", "GET")
                    .header("access-control-request-headers", "authorization")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(headers.get("access-control-allow-methods").unwrap(), "GET");
        assert_eq!(headers.get("access-control-allow-headers").unwrap(), "authorization");
    }

    #[tokio::test]
    async fn test_cors_origin_on_plain_response() {
        let response = app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers().get("access-control-allow-origin").unwrap(), "*");
        assert!(response.headers().get("access-control-allow-methods").is_none());
    }

    #[tokio::test]
    async fn test_security_headers() {
        let response = app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers.get("x-frame-options").unwrap(), "SAMEORIGIN");
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(
            headers.get("strict-transport-security").unwrap(),
            "max-age=63072000; includeSubDomains; preload"
        );
    }

    #[test]
    fn test_from_config_rejects_incomplete_config() {
        assert!(matches!(
            AppState::from_config(Config::default()),
            Err(ServerError::Config(_))
        ));
    }
}

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::{debug, warn};

use super::validate::SearchRequest;
use crate::auth::Session;

pub const SEARCH_PATH: &str = "/api/movies/search";

/// Default cap on the size of an upstream response body.
pub const MAX_UPSTREAM_BODY: usize = 4 * 1024 * 1024;

/// Wire form of a search request, as sent to the movie service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamQuery {
    pub q: String,
    pub page: String,
    pub limit: String,
}

impl From<&SearchRequest> for UpstreamQuery {
    fn from(req: &SearchRequest) -> Self {
        Self {
            q: req.query().to_string(),
            page: req.page().to_string(),
            limit: req.limit().to_string(),
        }
    }
}

/// Upstream JSON payload, kept as the exact text the movie service sent.
#[derive(Debug)]
pub struct SearchResponse(Box<RawValue>);

impl SearchResponse {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: Box<RawValue> = serde_json::from_slice(bytes)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    pub fn into_raw(self) -> Box<RawValue> {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Upstream returned status {0}")]
    Status(u16),
    #[error("Upstream returned invalid JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),
    #[error("Upstream response body exceeds {0} bytes")]
    BodyTooLarge(usize),
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch_search(
        &self,
        query: &UpstreamQuery,
        session: &Session,
    ) -> Result<SearchResponse, UpstreamError>;
}

pub struct HttpUpstreamClient {
    client: reqwest::Client,
    search_url: String,
    max_body: usize,
}

impl HttpUpstreamClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            search_url: build_url(base_url, SEARCH_PATH),
            max_body: MAX_UPSTREAM_BODY,
        })
    }

    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.max_body = max_body;
        self
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn fetch_search(
        &self,
        query: &UpstreamQuery,
        session: &Session,
    ) -> Result<SearchResponse, UpstreamError> {
        debug!(url = %self.search_url, q = %query.q, page = %query.page, limit = %query.limit, "Upstream search");

        let mut response = self
            .client
            .get(&self.search_url)
            .query(query)
            .bearer_auth(&session.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), url = %self.search_url, "Upstream search failed");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_body as u64 {
                warn!(length = len, url = %self.search_url, "Upstream response too large");
                return Err(UpstreamError::BodyTooLarge(self.max_body));
            }
        }

        // Content-Length is optional.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_body {
                warn!(url = %self.search_url, "Upstream response too large");
                return Err(UpstreamError::BodyTooLarge(self.max_body));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(SearchResponse::from_bytes(&body)?)
    }
}

fn build_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::validate::validate;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session() -> Session {
        Session {
            access_token: "upstream-token".to_string(),
            subject: None,
            expires_at: None,
        }
    }

    fn query() -> UpstreamQuery {
        UpstreamQuery::from(&validate(Some("the matrix"), Some("2"), None).unwrap())
    }

    fn client(server: &MockServer) -> HttpUpstreamClient {
        HttpUpstreamClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_upstream_query_wire_form() {
        assert_eq!(
            query(),
            UpstreamQuery {
                q: "the matrix".to_string(),
                page: "2".to_string(),
                limit: "20".to_string(),
            }
        );
    }

    #[test]
    fn test_build_url() {
        assert_eq!(
            build_url("http://backend:3001/", SEARCH_PATH),
            "http://backend:3001/api/movies/search"
        );
        assert_eq!(
            build_url("http://backend:3001", SEARCH_PATH),
            "http://backend:3001/api/movies/search"
        );
    }

    #[tokio::test]
    async fn test_fetch_search_sends_query_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SEARCH_PATH))
            .and(query_param("q", "the matrix"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "20"))
            .and(header("authorization", "Bearer upstream-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"movies":[{"id":1,"title":"The Matrix"}],"page":2}"#, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).fetch_search(&query(), &session()).await.unwrap();
        assert_eq!(
            response.as_str(),
            r#"{"movies":[{"id":1,"title":"The Matrix"}],"page":2}"#
        );
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).fetch_search(&query(), &session()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(503)));
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_search(&query(), &session()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidBody(_)));
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(format!(r#"{{"movies":"{}"}}"#, "x".repeat(2048)), "application/json"),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .with_max_body(1024)
            .fetch_search(&query(), &session())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::BodyTooLarge(1024)));

        let response = client(&server)
            .with_max_body(4096)
            .fetch_search(&query(), &session())
            .await
            .unwrap();
        assert_eq!(response.as_str().len(), 2048 + 13);
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = HttpUpstreamClient::new(&server.uri(), Duration::from_millis(100)).unwrap();
        let err = client.fetch_search(&query(), &session()).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Transport(_)));
    }
}

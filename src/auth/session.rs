use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};

/// Authenticated identity for one request. Built by a `SessionResolver`,
/// only ever read by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub subject: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unauthenticated")]
pub struct Unauthenticated;

#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve_session(&self, headers: &HeaderMap) -> Option<Session>;
}

pub async fn authenticate(
    resolver: &dyn SessionResolver,
    headers: &HeaderMap,
) -> Result<Session, Unauthenticated> {
    resolver.resolve_session(headers).await.ok_or(Unauthenticated)
}

/// Find the session credential: a named session cookie first, then a
/// bearer token.
pub fn extract_credential(headers: &HeaderMap, cookie_names: &[String]) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        if let Ok(cookies) = value.to_str() {
            if let Some(token) = find_cookie(cookies, cookie_names) {
                return Some(token);
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_bearer)
}

fn find_cookie(cookies: &str, names: &[String]) -> Option<String> {
    for name in names {
        for part in cookies.split(';') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            if key.trim() == name {
                let value = value.trim().trim_matches('"');
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

fn parse_bearer(auth_str: &str) -> Option<String> {
    let (scheme, token) = auth_str.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

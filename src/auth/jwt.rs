use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::session::{extract_credential, Session, SessionResolver};

/// Claims carried by the auth provider's session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(rename = "accessToken")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Resolves sessions from HS256 tokens signed with the shared session secret.
///
/// Tokens are signed JWTs (JWS) carrying `exp` and `accessToken`. Encrypted
/// tokens (JWE, as NextAuth issues by default) are rejected; the auth
/// provider must be configured to sign its session tokens with HS256.
pub struct JwtSessionResolver {
    key: DecodingKey,
    validation: Validation,
    cookie_names: Vec<String>,
}

impl JwtSessionResolver {
    pub fn new(secret: &str, cookie_names: Vec<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            cookie_names,
        }
    }

    pub fn verify(&self, token: &str) -> Option<Session> {
        let data = match decode::<SessionClaims>(token, &self.key, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                return None;
            }
        };

        let claims = data.claims;
        let Some(access_token) = claims.access_token.filter(|t| !t.is_empty()) else {
            debug!(sub = ?claims.sub, "Session token has no access token");
            return None;
        };

        Some(Session {
            access_token,
            subject: claims.sub,
            expires_at: DateTime::<Utc>::from_timestamp(claims.exp, 0),
        })
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve_session(&self, headers: &HeaderMap) -> Option<Session> {
        let token = extract_credential(headers, &self.cookie_names)?;
        self.verify(&token)
    }
}

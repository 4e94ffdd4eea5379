use serde::{Deserialize, Serialize};

use crate::search::{MAX_UPSTREAM_BODY, SEARCH_CACHE_TTL};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Include upstream error detail in 500 responses.
    #[serde(default)]
    pub development: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub baseurl: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_upstream_timeout")]
    pub timeout: u64,
    /// Largest upstream response body accepted, in bytes.
    #[serde(alias = "maxbody")]
    #[serde(default = "default_upstream_max_body")]
    pub max_body: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            baseurl: None,
            timeout: default_upstream_timeout(),
            max_body: default_upstream_max_body(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_cookie_names")]
    pub cookies: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            cookies: default_cookie_names(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(alias = "ttl_secs")]
    #[serde(default = "default_cache_ttl")]
    pub ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: default_cache_ttl(),
        }
    }
}

fn default_port() -> String {
    "3000".to_string()
}

fn default_upstream_timeout() -> u64 {
    10
}

fn default_upstream_max_body() -> usize {
    MAX_UPSTREAM_BODY
}

fn default_cookie_names() -> Vec<String> {
    vec![
        "moviegate.session-token".to_string(),
        "__Secure-moviegate.session-token".to_string(),
    ]
}

fn default_cache_ttl() -> u64 {
    SEARCH_CACHE_TTL
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_string(), e))?;

        Ok(config)
    }

    /// Apply the environment variables the web frontend was deployed with.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = var("BACKEND_URL").filter(|v| !v.is_empty()) {
            self.upstream.baseurl = Some(url);
        }
        if let Some(secret) = var("NEXTAUTH_SECRET").filter(|v| !v.is_empty()) {
            self.session.secret = Some(secret);
        }
        if let Some(port) = var("PORT").filter(|v| !v.is_empty()) {
            self.listen.port = port;
        }
        if let Some(env) = var("NODE_ENV") {
            self.development = env == "development";
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.upstream.baseurl.as_deref() {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
            Some(url) => return Err(ConfigError::Invalid("upstream.baseurl", url.to_string())),
            None => return Err(ConfigError::Missing("upstream.baseurl")),
        }
        if self.session.secret.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("session.secret"));
        }
        if self.session.cookies.is_empty() {
            return Err(ConfigError::Missing("session.cookies"));
        }
        if self.upstream.timeout == 0 {
            return Err(ConfigError::Invalid("upstream.timeout", "0".to_string()));
        }
        if self.upstream.max_body == 0 {
            return Err(ConfigError::Invalid("upstream.max_body", "0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

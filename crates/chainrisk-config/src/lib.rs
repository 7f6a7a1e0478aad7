//! Configuration loading for ChainRisk.
//! Reads chainrisk.toml from the current directory or the path in CHAINRISK_CONFIG,
//! then applies environment overrides. One `Config` is built at start and
//! handed to the gateway and the client; nothing else reads the environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub news: NewsConfig,
    pub model: ModelConfig,
    pub history: HistoryConfig,
    pub collector: CollectorConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16    { 8000 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the client finds the gateway and under which key it keeps the token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_token_key")]
    pub token_key: String,
}

fn default_base_url()  -> String { "http://127.0.0.1:8000".to_string() }
fn default_token_key() -> String { "access_token".to_string() }

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), token_key: default_token_key() }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Default::default() }
    }

    /// Join `path` onto the base URL with exactly one slash between them.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
    /// Require a bearer token on analyze, predict, train and me.
    #[serde(default = "bool_true")]
    pub protect_api: bool,
}

fn default_jwt_secret() -> String { "change_this_secret".to_string() }
fn default_token_ttl()  -> i64    { 60 * 24 }
fn bool_true()          -> bool   { true }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_minutes: default_token_ttl(),
            protect_api: true,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[redacted]")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("protect_api", &self.protect_api)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// NewsAPI key. Without one the canned mock source is used.
    pub api_key: Option<String>,
    #[serde(default = "default_news_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_news_timeout")]
    pub timeout_secs: u64,
}

fn default_news_endpoint() -> String { "https://newsapi.org/v2/everything".to_string() }
fn default_page_size()     -> usize  { 12 }
fn default_news_timeout()  -> u64    { 10 }

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_news_endpoint(),
            page_size: default_page_size(),
            timeout_secs: default_news_timeout(),
        }
    }
}

impl fmt::Debug for NewsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("endpoint", &self.endpoint)
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,
    /// Trained weights are written here and loaded at start if present.
    #[serde(default = "default_model_path")]
    pub model_path: Option<String>,
}

fn default_dataset_path() -> String         { "data/dataset.json".to_string() }
fn default_model_path()   -> Option<String> { Some("data/model.json".to_string()) }

impl Default for ModelConfig {
    fn default() -> Self {
        Self { dataset_path: default_dataset_path(), model_path: default_model_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// JSON snapshot of the history store. In-memory only when unset.
    pub path: Option<String>,
    #[serde(default = "default_days")]
    pub default_days: usize,
    #[serde(default = "default_max_days")]
    pub max_days: usize,
}

fn default_days()     -> usize { 30 }
fn default_max_days() -> usize { 365 }

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { path: None, default_days: default_days(), max_days: default_max_days() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval")]
    pub interval_minutes: u64,
    #[serde(default = "default_countries")]
    pub countries: Vec<String>,
}

fn default_interval() -> u64 { 360 }

fn default_countries() -> Vec<String> {
    [
        "India", "United States", "China", "Germany", "United Kingdom",
        "France", "Japan", "Brazil", "Australia", "Russia",
        "Canada", "South Africa", "Italy", "Spain", "Mexico",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self { enabled: false, interval_minutes: default_interval(), countries: default_countries() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_token_path")]
    pub token_path: String,
}

fn default_token_path() -> String { ".chainrisk/session.json".to_string() }

impl Default for ClientConfig {
    fn default() -> Self {
        Self { token_path: default_token_path() }
    }
}


impl Config {
    /// Load configuration from chainrisk.toml.
    /// Checks CHAINRISK_CONFIG env var first, then current directory.
    /// A missing file yields defaults; env overrides apply either way.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let path = std::env::var("CHAINRISK_CONFIG")
            .unwrap_or_else(|_| "chainrisk.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_file(Path::new(&path))?
        } else {
            tracing::info!(path = %path, "config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CHAINRISK_API_URL") {
            self.api.base_url = url;
        }
        if let Some(host) = lookup("CHAINRISK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(key) = lookup("NEWSAPI_KEY").filter(|k| !k.is_empty()) {
            self.news.api_key = Some(key);
        }
        Ok(())
    }
}

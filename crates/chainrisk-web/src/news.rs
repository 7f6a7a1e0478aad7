//! News sources feeding the risk engine.
//!
//! Endpoint: https://newsapi.org/v2/everything

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chainrisk_common::Article;
use chainrisk_config::NewsConfig;
use tracing::{debug, instrument};

/// Common interface for all news clients.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Recent articles mentioning `country`, newest first.
    async fn fetch(&self, country: &str, page_size: usize) -> anyhow::Result<Vec<Article>>;

    fn name(&self) -> &str;
}

pub struct NewsApiClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl NewsApiClient {
    pub fn new(cfg: &NewsConfig, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building news HTTP client")?;
        Ok(Self { endpoint: cfg.endpoint.clone(), api_key: api_key.into(), client })
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    #[instrument(skip(self))]
    async fn fetch(&self, country: &str, page_size: usize) -> anyhow::Result<Vec<Article>> {
        let page_size = page_size.to_string();
        let params = [
            ("q", country),
            ("pageSize", page_size.as_str()),
            ("sortBy", "publishedAt"),
            ("language", "en"),
            ("apiKey", self.api_key.as_str()),
        ];

        let resp = self.client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        let articles: Vec<Article> = resp["articles"]
            .as_array()
            .map(|items| items.iter().map(parse_article).collect())
            .unwrap_or_default();

        debug!(count = articles.len(), "NewsAPI returned articles");
        Ok(articles)
    }

    fn name(&self) -> &str { "newsapi" }
}

fn parse_article(a: &serde_json::Value) -> Article {
    Article {
        title: a["title"].as_str().unwrap_or("").to_string(),
        description: Some(a["description"].as_str().unwrap_or("").to_string()),
        source: a["source"]["name"].as_str().unwrap_or("Unknown").to_string(),
        url: a["url"].as_str().map(String::from),
        published_at: a["publishedAt"].as_str().map(String::from),
    }
}

/// Canned articles used when no NewsAPI key is configured.
#[derive(Debug, Default, Clone)]
pub struct MockNewsSource;

#[async_trait]
impl NewsSource for MockNewsSource {
    async fn fetch(&self, country: &str, page_size: usize) -> anyhow::Result<Vec<Article>> {
        let canned = [
            (format!("Port congestion rising in {}", country), "Ships experiencing delays."),
            (
                format!("Strike at major {} seaport disrupts shipments", country),
                "Workers halt operations for 48 hours.",
            ),
            (
                format!("{} trade deal eases shipping bottlenecks", country),
                "New policy expected to reduce delays.",
            ),
        ];

        Ok(canned
            .into_iter()
            .take(page_size)
            .map(|(title, description)| Article {
                title,
                description: Some(description.to_string()),
                source: "MockNews".to_string(),
                url: None,
                published_at: None,
            })
            .collect())
    }

    fn name(&self) -> &str { "mock" }
}

/// Pick the NewsAPI client when a key is configured, the mock otherwise.
pub fn from_config(cfg: &NewsConfig) -> anyhow::Result<Box<dyn NewsSource>> {
    match cfg.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => Ok(Box::new(NewsApiClient::new(cfg, key)?)),
        None => {
            tracing::warn!("NEWSAPI_KEY missing, using mock news data");
            Ok(Box::new(MockNewsSource))
        }
    }
}

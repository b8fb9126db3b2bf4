use anyhow::{Context, Result};
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Google News RSS search; the query goes in `q`.
pub const DEFAULT_FEED_URL: &str = "https://news.google.com/rss/search";

/// Source of recent headlines used to enrich the prompt.
#[async_trait::async_trait]
pub trait NewsSearch: Send + Sync {
    /// Return up to `max_results` headlines for `query`, most relevant first.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>>;
}

/// News search backed by an RSS search endpoint.
pub struct FeedNewsSearch {
    feed_url: String,
    client: Client,
}

impl FeedNewsSearch {
    pub fn new(feed_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("threadcast/0.1.0")
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            feed_url: feed_url.into(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl NewsSearch for FeedNewsSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        let url = url::Url::parse_with_params(&self.feed_url, &[("q", query)])
            .with_context(|| format!("invalid news feed URL: {}", self.feed_url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("network error during news search")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("news search failed with status: {}", status);
        }

        let bytes = response.bytes().await.context("failed to read news feed body")?;
        let feed = parser::parse(bytes.as_ref()).context("failed to parse news feed")?;

        let headlines: Vec<String> = feed
            .entries
            .iter()
            .filter_map(|entry| entry.title.as_ref())
            .map(|title| title.content.trim().to_string())
            .filter(|title| !title.is_empty())
            .take(max_results)
            .collect();

        debug!(query, count = headlines.len(), "news search returned headlines");
        Ok(headlines)
    }
}

use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::news::NewsSearch;

pub const DEFAULT_NEWS_HEADER: &str = "Here are some recent news headlines you can draw on:";
pub const DEFAULT_NEWS_QUERY: &str = "technology";
pub const DEFAULT_NEWS_RESULTS: usize = 5;

/// Parameters of the optional news block prepended to the prompt.
pub struct NewsEnrichment<'a> {
    pub search: &'a dyn NewsSearch,
    pub query: &'a str,
    pub max_results: usize,
    pub header: &'a str,
}

/// Header line followed by one `- headline` bullet per result.
/// Empty when there are no headlines.
pub fn format_news_block(header: &str, headlines: &[String]) -> String {
    if headlines.is_empty() {
        return String::new();
    }

    let mut block = String::from(header);
    for headline in headlines {
        block.push_str("\n- ");
        block.push_str(headline);
    }
    block
}

/// Best-effort news block; search failures degrade to an empty block.
pub async fn news_block(enrichment: &NewsEnrichment<'_>) -> String {
    match enrichment
        .search
        .search(enrichment.query, enrichment.max_results)
        .await
    {
        Ok(headlines) => {
            info!(query = enrichment.query, count = headlines.len(), "news enrichment fetched");
            let headlines: Vec<String> = headlines.into_iter().take(enrichment.max_results).collect();
            format_news_block(enrichment.header, &headlines)
        }
        Err(e) => {
            warn!(query = enrichment.query, error = %format!("{:#}", e), "news search failed, continuing without enrichment");
            String::new()
        }
    }
}

/// Read the base prompt and optionally prefix it with a news block.
///
/// The prompt file is read before any network call, so a missing file fails fast.
pub async fn assemble_prompt(prompt_file: &Path, enrichment: Option<NewsEnrichment<'_>>) -> Result<String> {
    let base = tokio::fs::read_to_string(prompt_file).await.map_err(|e| {
        Error::config(format!("failed to read prompt file {}: {}", prompt_file.display(), e))
    })?;

    if base.trim().is_empty() {
        return Err(Error::config(format!("prompt file {} is empty", prompt_file.display())));
    }

    let block = match enrichment {
        Some(enrichment) => news_block(&enrichment).await,
        None => String::new(),
    };

    if block.is_empty() {
        Ok(base)
    } else {
        Ok(format!("{}\n\n{}", block, base))
    }
}

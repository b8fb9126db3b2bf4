//! The two entry points: generate a post batch, publish a post batch.

use std::path::PathBuf;
use tracing::{error, info};

use common::Config;

use crate::artifact::{self, DEFAULT_OUTPUT_DIR};
use crate::error::{Error, Result};
use crate::image;
use crate::llm::{LlmProvider, LlmRequest};
use crate::news::NewsSearch;
use crate::parser::{parse_post_batch, strip_code_fence, PostBatch};
use crate::prompt::{self, NewsEnrichment};
use crate::publish::{PublishSettings, ThreadPublisher, ThreadReport};
use crate::social::SocialClient;

pub const DEFAULT_PROMPT_FILE: &str = "prompt.txt";

#[derive(Debug, Clone)]
pub struct NewsSettings {
    pub query: String,
    pub max_results: usize,
    pub header: String,
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub prompt_file: PathBuf,
    pub output_dir: PathBuf,
    pub max_tokens: Option<usize>,
    /// Present when the prompt should be enriched with headlines
    pub news: Option<NewsSettings>,
}

impl GeneratorSettings {
    pub fn from_config(cfg: &Config, prompt_file: Option<PathBuf>, with_news: bool) -> Self {
        let news = with_news.then(|| NewsSettings {
            query: cfg
                .news
                .query
                .clone()
                .unwrap_or_else(|| prompt::DEFAULT_NEWS_QUERY.to_string()),
            max_results: cfg.news.max_results.unwrap_or(prompt::DEFAULT_NEWS_RESULTS),
            header: cfg
                .news
                .header
                .clone()
                .unwrap_or_else(|| prompt::DEFAULT_NEWS_HEADER.to_string()),
        });

        Self {
            prompt_file: prompt_file
                .or_else(|| cfg.generator.prompt_file.as_ref().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROMPT_FILE)),
            output_dir: cfg
                .generator
                .output_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            max_tokens: cfg.llm.max_tokens,
            news,
        }
    }
}

/// Result of a generator run.
#[derive(Debug, Clone)]
pub struct GeneratedBatch {
    pub batch: PostBatch,
    pub artifact: PathBuf,
}

/// Build the prompt, query the model, parse its reply and persist the batch.
///
/// A reply that is not a JSON list of strings is logged with the raw text and
/// returned as [`Error::Format`].
pub async fn run_generator(
    llm: &dyn LlmProvider,
    news: Option<&dyn NewsSearch>,
    settings: &GeneratorSettings,
) -> Result<GeneratedBatch> {
    let enrichment = match (news, settings.news.as_ref()) {
        (Some(search), Some(news_settings)) => Some(NewsEnrichment {
            search,
            query: &news_settings.query,
            max_results: news_settings.max_results,
            header: &news_settings.header,
        }),
        _ => None,
    };

    let prompt = prompt::assemble_prompt(&settings.prompt_file, enrichment).await?;
    info!(prompt_chars = prompt.chars().count(), "generating posts");

    let response = llm
        .generate(LlmRequest {
            prompt,
            max_tokens: settings.max_tokens,
            temperature: None,
            timeout_seconds: None,
        })
        .await
        .map_err(Error::Generation)?;

    info!(
        model = %response.model,
        total_tokens = response.usage.total_tokens,
        "model responded"
    );

    let batch = match parse_post_batch(&response.content) {
        Ok(batch) => batch,
        Err(e) => {
            error!(error = %e, raw = %e.raw(), "model output is not a JSON list of strings");
            return Err(e.into());
        }
    };

    // the model's own JSON text, minus any code fence
    let payload = strip_code_fence(&response.content);
    let artifact = artifact::write_artifact(&settings.output_dir, payload, chrono::Local::now()).await?;
    info!(posts = batch.len(), path = %artifact.display(), "saved generated posts");

    Ok(GeneratedBatch { batch, artifact })
}

#[derive(Debug, Clone, Default)]
pub struct PublisherSettings {
    pub publish: PublishSettings,
    pub image_dir: Option<PathBuf>,
    /// Apply the one-time random delay before the first post
    pub jitter: bool,
}

impl PublisherSettings {
    pub fn from_config(cfg: &Config, image_dir: Option<PathBuf>, jitter: bool) -> Result<Self> {
        Ok(Self {
            publish: PublishSettings::from_config(&cfg.publisher)?,
            image_dir: image_dir.or_else(|| cfg.publisher.image_dir.as_ref().map(PathBuf::from)),
            jitter,
        })
    }
}

/// Publish `batch` as a thread: optional jitter, optional image, then the reply chain.
pub async fn run_publisher(
    client: &dyn SocialClient,
    batch: &PostBatch,
    settings: &PublisherSettings,
) -> Result<ThreadReport> {
    if batch.is_empty() {
        info!("post batch is empty, nothing to publish");
        return Ok(ThreadReport::default());
    }

    let publisher = ThreadPublisher::new(client, settings.publish.clone());

    if settings.jitter {
        publisher.apply_jitter().await;
    }

    let media = image::prepare_image(client, settings.image_dir.as_deref()).await;

    let report = publisher.publish_thread(batch, media).await?;
    for (index, result) in report.results.iter().enumerate() {
        info!(item = index + 1, attempts = result.attempts(), "{}", result);
    }
    info!(
        published = report.published(),
        last_id = ?report.last_id().map(|id| id.0.as_str()),
        "thread published"
    );
    Ok(report)
}

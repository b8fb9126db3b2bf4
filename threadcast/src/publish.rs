//! Sequential thread publishing with per-item retry.
//!
//! Items are published strictly one after the other; item `i + 1` replies to the
//! remote id returned for item `i`. A single item that keeps failing aborts the
//! whole run: posts already published stay live.

use rand::Rng;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use common::PublisherConfig;

use crate::error::{Error, Result};
use crate::parser::PostBatch;
use crate::segment::{expand_post, SegmentLimits};
use crate::social::{MediaId, PostId, SocialClient, SocialError};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_INTER_POST_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub limits: SegmentLimits,
    /// Attempts per item, first attempt included
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub inter_post_delay: Duration,
    /// Upper bound of the one-time delay before the first item
    pub max_jitter: Duration,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            limits: SegmentLimits::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            inter_post_delay: DEFAULT_INTER_POST_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl PublishSettings {
    /// Settings from `[publisher]`; limits that leave no room for text are a config error.
    pub fn from_config(cfg: &PublisherConfig) -> Result<Self> {
        let defaults = Self::default();
        let limits = SegmentLimits::new(
            cfg.max_chars.unwrap_or(defaults.limits.max_chars),
            cfg.suffix_reserve.unwrap_or(defaults.limits.suffix_reserve),
        );
        limits.validate().map_err(Error::config)?;

        Ok(Self {
            limits,
            max_retries: cfg.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff: cfg
                .retry_backoff_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_backoff),
            inter_post_delay: cfg
                .inter_post_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.inter_post_delay),
            max_jitter: cfg
                .max_jitter_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_jitter),
        })
    }
}

/// Outcome of one thread item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResult {
    Success { remote_id: PostId, attempts: u32 },
    Failed { error: String, attempts: u32 },
}

impl PublishResult {
    pub fn attempts(&self) -> u32 {
        match self {
            PublishResult::Success { attempts, .. } | PublishResult::Failed { attempts, .. } => *attempts,
        }
    }
}

impl fmt::Display for PublishResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishResult::Success { remote_id, attempts } => {
                write!(f, "published as {} after {} attempt(s)", remote_id, attempts)
            }
            PublishResult::Failed { error, attempts } => {
                write!(f, "failed after {} attempt(s): {}", attempts, error)
            }
        }
    }
}

/// Per-item outcomes of one publish run, in thread order.
#[derive(Debug, Clone, Default)]
pub struct ThreadReport {
    pub results: Vec<PublishResult>,
}

impl ThreadReport {
    /// Number of items that are live on the platform.
    pub fn published(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, PublishResult::Success { .. }))
            .count()
    }

    /// Remote id of the last published item.
    pub fn last_id(&self) -> Option<&PostId> {
        self.results.iter().rev().find_map(|r| match r {
            PublishResult::Success { remote_id, .. } => Some(remote_id),
            PublishResult::Failed { .. } => None,
        })
    }
}

/// Lifecycle of a single item.
enum ItemState {
    Pending,
    Attempting { attempt: u32 },
    Succeeded { remote_id: PostId, attempts: u32 },
    Failed { error: SocialError, attempts: u32 },
}

pub struct ThreadPublisher<'a> {
    client: &'a dyn SocialClient,
    settings: PublishSettings,
}

impl<'a> ThreadPublisher<'a> {
    pub fn new(client: &'a dyn SocialClient, settings: PublishSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Thread items for `batch`: each post, or its pages when it is too long.
    pub fn thread_items(&self, batch: &PostBatch) -> Vec<String> {
        batch
            .posts()
            .iter()
            .flat_map(|post| expand_post(post, &self.settings.limits))
            .collect()
    }

    /// Sleep a uniformly random duration in `[0, max_jitter]` and return it.
    pub async fn apply_jitter(&self) -> Duration {
        let max_ms = self.settings.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }

        let delay = Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms));
        info!(delay_secs = delay.as_secs(), "waiting before publishing");
        tokio::time::sleep(delay).await;
        delay
    }

    async fn publish_item(
        &self,
        item: usize,
        text: &str,
        media: Option<&MediaId>,
        reply_to: Option<&PostId>,
    ) -> std::result::Result<(PostId, u32), (SocialError, u32)> {
        let max_attempts = self.settings.max_retries.max(1);
        let mut state = ItemState::Pending;

        loop {
            state = match state {
                ItemState::Pending => ItemState::Attempting { attempt: 1 },
                ItemState::Attempting { attempt } => {
                    debug!(item, attempt, reply_to = ?reply_to.map(|p| p.0.as_str()), "publishing item");
                    match self.client.create_post(text, media, reply_to).await {
                        Ok(remote_id) => ItemState::Succeeded {
                            remote_id,
                            attempts: attempt,
                        },
                        Err(e) => {
                            warn!(
                                item,
                                attempt,
                                max_attempts,
                                error = %e,
                                diagnostics = e.diagnostics().unwrap_or(""),
                                "publish attempt failed"
                            );
                            if attempt >= max_attempts {
                                ItemState::Failed {
                                    error: e,
                                    attempts: attempt,
                                }
                            } else {
                                tokio::time::sleep(self.settings.retry_backoff).await;
                                ItemState::Attempting { attempt: attempt + 1 }
                            }
                        }
                    }
                }
                ItemState::Succeeded { remote_id, attempts } => return Ok((remote_id, attempts)),
                ItemState::Failed { error, attempts } => return Err((error, attempts)),
            };
        }
    }

    /// Publish `batch` as one reply chain; `media` goes on the first item only.
    ///
    /// Waits `inter_post_delay` before every item after the first.
    pub async fn publish_thread(&self, batch: &PostBatch, media: Option<MediaId>) -> Result<ThreadReport> {
        let items = self.thread_items(batch);
        info!(posts = batch.len(), items = items.len(), "publishing thread");

        let mut report = ThreadReport::default();
        let mut parent: Option<PostId> = None;

        for (index, text) in items.iter().enumerate() {
            let item = index + 1;

            if index > 0 {
                debug!(delay_secs = self.settings.inter_post_delay.as_secs(), "pausing between posts");
                tokio::time::sleep(self.settings.inter_post_delay).await;
            }

            let item_media = if index == 0 { media.as_ref() } else { None };

            match self.publish_item(item, text, item_media, parent.as_ref()).await {
                Ok((remote_id, attempts)) => {
                    info!(item, total = items.len(), id = %remote_id, attempts, "post published");
                    parent = Some(remote_id.clone());
                    report.results.push(PublishResult::Success { remote_id, attempts });
                }
                Err((source, attempts)) => {
                    error!(
                        item,
                        attempts,
                        published = report.published(),
                        error = %source,
                        "retry ceiling reached, aborting thread"
                    );
                    report.results.push(PublishResult::Failed {
                        error: source.to_string(),
                        attempts,
                    });
                    return Err(Error::RetriesExhausted {
                        item,
                        attempts,
                        report,
                        source,
                    });
                }
            }
        }

        Ok(report)
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub mod oauth;
pub mod x;

/// Remote identifier of a published post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

/// Platform reference to uploaded media, attachable to a post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaId(pub String);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        PostId(s.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response; `body` is the platform's diagnostic payload.
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("unexpected API response: {0}")]
    Decode(String),

    #[error("failed to read media file {}: {source}", path.display())]
    Media {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SocialError {
    /// Response payload returned by the platform, if there was one.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            SocialError::Api { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Publishing side of a social network.
#[async_trait::async_trait]
pub trait SocialClient: Send + Sync {
    /// Publish one message, optionally with media and as a reply to `reply_to`.
    async fn create_post(
        &self,
        text: &str,
        media: Option<&MediaId>,
        reply_to: Option<&PostId>,
    ) -> Result<PostId, SocialError>;

    /// Upload a local file and return its media reference.
    async fn upload_media(&self, path: &Path) -> Result<MediaId, SocialError>;
}

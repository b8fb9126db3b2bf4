use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::oauth::OAuthCredentials;
use super::{MediaId, PostId, SocialClient, SocialError};

pub const DEFAULT_API_BASE: &str = "https://api.x.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// X API v2 client acting on behalf of one account (OAuth 1.0a user context).
#[derive(Clone)]
pub struct XClient {
    api_base: String,
    credentials: OAuthCredentials,
    http: Client,
}

impl XClient {
    /// `timeout` bounds each request, body included; a stalled call surfaces as
    /// [`SocialError::Http`] and goes through the normal retry path.
    pub fn new(
        api_base: impl Into<String>,
        credentials: OAuthCredentials,
        timeout: Duration,
    ) -> Result<Self, SocialError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("threadcast/0.1.0")
            .build()?;

        Ok(Self {
            api_base: api_base.into(),
            credentials,
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    /// Get the authenticated account; doubles as a credential check.
    pub async fn get_me(&self) -> Result<XUser, SocialError> {
        let url = self.endpoint("/2/users/me");

        let resp = self
            .http
            .get(&url)
            .header(
                "Authorization",
                self.credentials.authorization_header("GET", &url, &[]),
            )
            .send()
            .await?;

        let text = read_body(resp).await?;
        let wrapper: UserResponse = serde_json::from_str(&text)
            .map_err(|e| SocialError::Decode(format!("{} - body: {}", e, text)))?;
        Ok(wrapper.data)
    }
}

/// Return the body of a successful response, or the status and body as an API error.
async fn read_body(resp: reqwest::Response) -> Result<String, SocialError> {
    let status = resp.status();
    let text = resp.text().await?;

    if !status.is_success() {
        return Err(SocialError::Api {
            status: status.as_u16(),
            body: text,
        });
    }

    Ok(text)
}

fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[async_trait::async_trait]
impl SocialClient for XClient {
    async fn create_post(
        &self,
        text: &str,
        media: Option<&MediaId>,
        reply_to: Option<&PostId>,
    ) -> Result<PostId, SocialError> {
        let url = self.endpoint("/2/tweets");

        let mut body = serde_json::json!({ "text": text });

        if let Some(parent_id) = reply_to {
            body["reply"] = serde_json::json!({
                "in_reply_to_tweet_id": parent_id.0
            });
        }

        if let Some(media_id) = media {
            body["media"] = serde_json::json!({
                "media_ids": [media_id.0]
            });
        }

        let resp = self
            .http
            .post(&url)
            .header(
                "Authorization",
                self.credentials.authorization_header("POST", &url, &[]),
            )
            .json(&body)
            .send()
            .await?;

        let text = read_body(resp).await?;
        let wrapper: TweetResponseWrapper = serde_json::from_str(&text)
            .map_err(|e| SocialError::Decode(format!("{} - body: {}", e, text)))?;

        debug!(id = %wrapper.data.id, "post created");
        Ok(PostId(wrapper.data.id))
    }

    async fn upload_media(&self, path: &Path) -> Result<MediaId, SocialError> {
        let data = tokio::fs::read(path).await.map_err(|source| SocialError::Media {
            path: path.to_path_buf(),
            source,
        })?;

        let media_type = media_type_for(path);
        let media_category = if media_type == "image/gif" {
            "tweet_gif"
        } else {
            "tweet_image"
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "media".to_string());

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(media_type)
            .map_err(|e| SocialError::Decode(format!("invalid mime type {}: {}", media_type, e)))?;

        let form = reqwest::multipart::Form::new()
            .text("media_category", media_category)
            .text("media_type", media_type)
            .part("media", part);

        let url = self.endpoint("/2/media/upload");

        let resp = self
            .http
            .post(&url)
            .header(
                "Authorization",
                self.credentials.authorization_header("POST", &url, &[]),
            )
            .multipart(form)
            .send()
            .await?;

        let text = read_body(resp).await?;
        let wrapper: MediaUploadResponse = serde_json::from_str(&text)
            .map_err(|e| SocialError::Decode(format!("{} - body: {}", e, text)))?;

        debug!(id = %wrapper.data.id, path = %path.display(), "media uploaded");
        Ok(MediaId(wrapper.data.id))
    }
}

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    data: MediaUploadData,
}

#[derive(Debug, Deserialize)]
struct MediaUploadData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: XUser,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct XUser {
    pub id: String,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct TweetResponseWrapper {
    data: TweetResponse,
}

#[derive(Debug, Deserialize)]
struct TweetResponse {
    id: String,
}

//! OAuth 1.0a (HMAC-SHA1) request signing for user-context X API calls.

use anyhow::Result;
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;
use std::fmt;

use common::XConfig;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters stay as-is; everything else is encoded.
const OAUTH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub const DEFAULT_CONSUMER_KEY_ENV: &str = "X_API_KEY";
pub const DEFAULT_CONSUMER_SECRET_ENV: &str = "X_API_SECRET";
pub const DEFAULT_ACCESS_TOKEN_ENV: &str = "X_ACCESS_TOKEN";
pub const DEFAULT_ACCESS_TOKEN_SECRET_ENV: &str = "X_ACCESS_TOKEN_SECRET";

#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &self.access_token)
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

impl OAuthCredentials {
    /// Read all four credentials from the env vars named in `[x]`.
    pub fn from_env(config: &XConfig) -> Result<Self> {
        let var = |configured: &Option<String>, default: &str| {
            common::require_env(configured.as_deref().unwrap_or(default))
        };

        Ok(Self {
            consumer_key: var(&config.consumer_key_env, DEFAULT_CONSUMER_KEY_ENV)?,
            consumer_secret: var(&config.consumer_secret_env, DEFAULT_CONSUMER_SECRET_ENV)?,
            access_token: var(&config.access_token_env, DEFAULT_ACCESS_TOKEN_ENV)?,
            access_token_secret: var(&config.access_token_secret_env, DEFAULT_ACCESS_TOKEN_SECRET_ENV)?,
        })
    }

    /// `Authorization` header value for a request with a fresh nonce and timestamp.
    ///
    /// `params` are the query or form parameters covered by the signature; JSON and
    /// multipart bodies are not signed.
    pub fn authorization_header(&self, method: &str, url: &str, params: &[(&str, &str)]) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.authorization_header_with(method, url, params, &nonce, &timestamp)
    }

    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> String {
        let mut oauth_params = self.oauth_params(nonce, timestamp);

        let mut all_params = oauth_params.clone();
        all_params.extend(params.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let base = signature_base_string(method, url, &all_params);
        oauth_params.push(("oauth_signature".to_string(), self.sign(&base)));
        oauth_params.sort();

        let fields: Vec<String> = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect();

        format!("OAuth {}", fields.join(", "))
    }

    fn oauth_params(&self, nonce: &str, timestamp: &str) -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.access_token.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ]
    }

    /// Base64 HMAC-SHA1 of `base` keyed with both secrets.
    pub fn sign(&self, base: &str) -> String {
        let key = format!("{}&{}", encode(&self.consumer_secret), encode(&self.access_token_secret));
        let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
        mac.update(base.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE).to_string()
}

/// `METHOD&url&params` with params percent-encoded, sorted and joined.
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}&{}&{}", method.to_uppercase(), encode(url), encode(&param_string))
}

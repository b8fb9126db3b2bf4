//! Decoding of the model's reply into an ordered batch of posts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered list of post texts; the order is the thread order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostBatch(Vec<String>);

impl PostBatch {
    pub fn new(posts: Vec<String>) -> Self {
        Self(posts)
    }

    pub fn posts(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact JSON array, as written to the artifact and handed to the publisher.
    pub fn to_json(&self) -> String {
        // a Vec<String> always serializes
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("model output is not valid JSON: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
    #[error("model output is {found}, expected a JSON array of strings")]
    NotAList { found: &'static str, raw: String },
    #[error("element {index} of the model output is {found}, expected a string")]
    NonString {
        index: usize,
        found: &'static str,
        raw: String,
    },
    #[error("element {index} of the model output is blank")]
    Blank { index: usize, raw: String },
}

impl ParseError {
    /// The offending text exactly as received.
    pub fn raw(&self) -> &str {
        match self {
            ParseError::Decode { raw, .. }
            | ParseError::NotAList { raw, .. }
            | ParseError::NonString { raw, .. }
            | ParseError::Blank { raw, .. } => raw,
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Remove a surrounding fenced code block (```` ```json ... ``` ````) if both fences are present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let inner = match trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    {
        Some(inner) => inner,
        None => return trimmed,
    };

    // info string such as "json" right after the opening fence
    let tag_len = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+')))
        .unwrap_or(inner.len());

    inner[tag_len..].trim()
}

/// Strictly decode `raw` into a [`PostBatch`].
///
/// The payload must be a JSON array whose elements are all non-blank strings.
pub fn parse_post_batch(raw: &str) -> Result<PostBatch, ParseError> {
    let payload = strip_code_fence(raw);

    let value: Value = serde_json::from_str(payload).map_err(|source| ParseError::Decode {
        source,
        raw: raw.to_string(),
    })?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ParseError::NotAList {
                found: describe(&other),
                raw: raw.to_string(),
            })
        }
    };

    let mut posts = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::String(s) if s.trim().is_empty() => {
                return Err(ParseError::Blank {
                    index,
                    raw: raw.to_string(),
                })
            }
            Value::String(s) => posts.push(s),
            other => {
                return Err(ParseError::NonString {
                    index,
                    found: describe(&other),
                    raw: raw.to_string(),
                })
            }
        }
    }

    Ok(PostBatch::new(posts))
}

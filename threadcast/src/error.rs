use std::path::PathBuf;

use crate::parser::ParseError;
use crate::publish::ThreadReport;
use crate::social::SocialError;

/// Unrecoverable failures of either pipeline.
///
/// Auxiliary failures (news search, image upload) never reach this type; they
/// are logged and swallowed where they happen.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing credential, prompt file or required environment value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The model ignored the output format.
    #[error(transparent)]
    Format(#[from] ParseError),

    #[error("generation request failed: {0:#}")]
    Generation(anyhow::Error),

    /// One thread item kept failing until the retry ceiling was reached.
    #[error("post {item} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        item: usize,
        attempts: u32,
        report: ThreadReport,
        #[source]
        source: SocialError,
    },

    #[error("failed to write artifact {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn config(err: impl std::fmt::Display) -> Self {
        Error::Config(err.to_string())
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_)
            | Error::Format(_)
            | Error::Generation(_)
            | Error::RetriesExhausted { .. }
            | Error::Artifact { .. } => 1,
        }
    }
}

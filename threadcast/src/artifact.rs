use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::parser::PostBatch;

pub const DEFAULT_OUTPUT_DIR: &str = "generated_posts";

/// `raw_tweets_<YYYYMMDD_HHMMSS>.md`
pub fn artifact_file_name(at: DateTime<Local>) -> String {
    format!("raw_tweets_{}.md", at.format("%Y%m%d_%H%M%S"))
}

/// Write `contents` to a new timestamped file under `dir`, creating `dir` if needed.
///
/// Existing files are never overwritten.
pub async fn write_artifact(dir: &Path, contents: &str, at: DateTime<Local>) -> Result<PathBuf> {
    let path = dir.join(artifact_file_name(at));
    let io_err = |source| Error::Artifact {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(io_err)?;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(io_err)?;
    file.write_all(contents.as_bytes()).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;

    Ok(path)
}

/// Append `filename=` and `posts=` lines to a GitHub Actions output file.
pub async fn append_github_output(output_file: &Path, artifact: &Path, batch: &PostBatch) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_file)
        .await?;

    let lines = format!("filename={}\nposts={}\n", artifact.display(), batch.to_json());
    file.write_all(lines.as_bytes()).await?;
    file.flush().await
}

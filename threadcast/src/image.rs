use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::social::{MediaId, SocialClient};

/// Regular files directly inside `dir`, sorted by path. No extension filtering.
pub async fn list_candidates(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // follows symlinks, unlike DirEntry::file_type
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable image entry"),
        }
    }

    files.sort();
    Ok(files)
}

/// Uniform pick among `candidates`.
pub fn choose<'a, R: Rng + ?Sized>(candidates: &'a [PathBuf], rng: &mut R) -> Option<&'a PathBuf> {
    candidates.choose(rng)
}

/// Pick one random file from `dir`, or `None` when the directory is missing or empty.
pub async fn select_random_image(dir: &Path) -> Option<PathBuf> {
    let candidates = match list_candidates(dir).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read image directory, posting without image");
            return None;
        }
    };

    let picked = choose(&candidates, &mut rand::thread_rng()).cloned();
    if picked.is_none() {
        info!(dir = %dir.display(), "image directory is empty, posting without image");
    }
    picked
}

/// Select and upload an image for the first post. Every failure degrades to `None`.
pub async fn prepare_image(client: &dyn SocialClient, dir: Option<&Path>) -> Option<MediaId> {
    let dir = dir?;
    let path = select_random_image(dir).await?;

    match client.upload_media(&path).await {
        Ok(media_id) => {
            info!(path = %path.display(), media_id = %media_id, "image uploaded");
            Some(media_id)
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                diagnostics = e.diagnostics().unwrap_or(""),
                "image upload failed, posting without image"
            );
            None
        }
    }
}

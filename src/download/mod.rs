pub mod rename;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use url::Url;

use crate::extract::{ImageCandidate, SortKey};

/// Outcome status of one download attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Success,
    Failed,
    Skipped,
}

/// Outcome of one download attempt
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub url: Url,
    pub path: Option<PathBuf>,
    pub bytes: u64,
    pub status: DownloadStatus,
    pub sort_key: Option<SortKey>,
}

impl DownloadResult {
    /// Record for a candidate the classifier rejected; kept for the summary
    /// counts, never downloaded.
    pub fn skipped(url: Url) -> Self {
        Self {
            url,
            path: None,
            bytes: 0,
            status: DownloadStatus::Skipped,
            sort_key: None,
        }
    }
}

/// Sequential, rate-limited downloader. One candidate at a time with a fixed
/// pause between attempts; a failure never aborts the batch.
pub struct Downloader {
    client: reqwest::Client,
    delay: Duration,
}

impl Downloader {
    pub fn new(client: reqwest::Client, delay_secs: f64) -> Self {
        Self {
            client,
            delay: Duration::from_secs_f64(delay_secs.max(0.0)),
        }
    }

    /// Download every candidate into `dir`, creating it first
    pub async fn download_all(
        &self,
        candidates: &[ImageCandidate],
        dir: &Path,
    ) -> Result<Vec<DownloadResult>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        tokio::fs::create_dir_all(dir)
            .await
            .context(format!("Failed to create save directory: {}", dir.display()))?;

        let mut results = Vec::with_capacity(candidates.len());

        for (i, candidate) in candidates.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            info!(
                "[{:03}/{:03}] Downloading {}",
                i + 1,
                candidates.len(),
                candidate.url
            );

            let result = self.download_one(candidate, dir).await;
            match result.status {
                DownloadStatus::Success => {
                    if let Some(path) = &result.path {
                        info!("Saved {} ({} bytes)", path.display(), result.bytes);
                    }
                }
                _ => warn!("Download failed for {}", candidate.url),
            }

            results.push(result);
        }

        Ok(results)
    }

    async fn download_one(&self, candidate: &ImageCandidate, dir: &Path) -> DownloadResult {
        let path = free_path(dir, &file_name_for(&candidate.url));

        match self.write_body(&candidate.url, &path).await {
            Ok(bytes) => DownloadResult {
                url: candidate.url.clone(),
                path: Some(path),
                bytes,
                status: DownloadStatus::Success,
                sort_key: candidate.sort_key.clone(),
            },
            Err(e) => {
                warn!("{}: {:#}", candidate.url, e);
                // Never leave a truncated file behind
                if path.exists() {
                    if let Err(e) = std::fs::remove_file(&path) {
                        warn!("Failed to remove partial file {}: {}", path.display(), e);
                    }
                }
                DownloadResult {
                    url: candidate.url.clone(),
                    path: None,
                    bytes: 0,
                    status: DownloadStatus::Failed,
                    sort_key: candidate.sort_key.clone(),
                }
            }
        }
    }

    async fn write_body(&self, url: &Url, path: &Path) -> Result<u64> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .context("request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("server answered with status {}", status);
        }

        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !looks_like_image(content_type) {
                bail!("non-image content type: {}", content_type);
            }
        }

        let mut file = tokio::fs::File::create(path)
            .await
            .context(format!("cannot create {}", path.display()))?;

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("body stream interrupted")?;
            file.write_all(&chunk).await.context("write failed")?;
            written += chunk.len() as u64;
        }

        file.flush().await.context("flush failed")?;
        Ok(written)
    }
}

/// Derive the per-page save directory under `output_base`: the page's `ID`
/// query parameter when present, otherwise a name built from the URL path.
pub fn save_directory(page_url: &Url, output_base: &Path) -> PathBuf {
    let id = page_url
        .query_pairs()
        .find(|(key, _)| key == "ID")
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.is_empty());

    let name = match id {
        Some(id) => id,
        None => {
            let path_part = page_url.path().trim_matches('/').replace('/', "_");
            if path_part.is_empty() {
                "images".to_string()
            } else {
                path_part
            }
        }
    };

    output_base.join(name)
}

/// Filename for a URL: its final path segment, with a generic fallback
fn file_name_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .unwrap_or_else(|| "image.jpg".to_string())
}

/// First free path for `name` in `dir`, appending `_1`, `_2`, ... before the
/// extension until no file with that name exists. Never overwrites.
fn free_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), Some(ext.to_string())),
        None => (name.to_string(), None),
    };

    let mut counter = 1;
    loop {
        let suffixed = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = dir.join(suffixed);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn looks_like_image(content_type: &str) -> bool {
    let lowered = content_type.to_lowercase();
    lowered.starts_with("image/")
        || ["jpeg", "jpg", "png", "gif", "webp", "bmp", "svg"]
            .iter()
            .any(|ext| lowered.contains(ext))
}

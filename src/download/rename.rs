use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{DownloadResult, DownloadStatus};
use crate::extract::SortKey;

/// Renumber successfully downloaded files into `{index:03}.{ext}` order,
/// index starting at 0, following the sort keys discovered during
/// extraction. A no-op when no sort key was ever populated.
///
/// Renaming goes through a temporary subdirectory so overlapping old and new
/// names never clobber each other; target collisions with unrelated files on
/// disk fall back to the downloader's numeric suffix rule.
pub fn rename_by_sort_order(results: &[DownloadResult], dir: &Path) -> Result<()> {
    let mut files: Vec<(PathBuf, Option<SortKey>)> = results
        .iter()
        .filter(|r| r.status == DownloadStatus::Success)
        .filter_map(|r| r.path.clone().map(|path| (path, r.sort_key.clone())))
        .collect();

    if !files.iter().any(|(_, key)| key.is_some()) {
        debug!("No sort keys discovered, keeping original filenames");
        return Ok(());
    }

    info!("Renaming {} files into sort order", files.len());

    // Stable sort: keyed entries ascending, keyless ones after them in their
    // original download order
    files.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let temp_dir = dir.join("rename_tmp");
    fs::create_dir_all(&temp_dir).context("Failed to create rename staging directory")?;

    // Phase 1: move everything out of the way
    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
    for (i, (original, _)) in files.iter().enumerate() {
        if !original.exists() {
            warn!("File disappeared before rename: {}", original.display());
            continue;
        }
        let staged_path = temp_dir.join(format!("tmp_{:03}", i));
        fs::rename(original, &staged_path)
            .context(format!("Failed to stage {}", original.display()))?;
        staged.push((staged_path, original.clone()));
    }

    // Phase 2: assign the final zero-padded names
    for (index, (staged_path, original)) in staged.iter().enumerate() {
        let extension = original
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_else(|| "jpg".to_string());

        let name = format!("{:03}.{}", index, extension);
        let target = super::free_path(dir, &name);

        fs::rename(staged_path, &target)
            .context(format!("Failed to rename to {}", target.display()))?;
        debug!(
            "Renamed {} -> {}",
            original.display(),
            target.display()
        );
    }

    if let Err(e) = fs::remove_dir(&temp_dir) {
        warn!("Could not remove staging directory: {}", e);
    }

    Ok(())
}

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

use crate::archive;
use crate::cli::config::GrabConfig;
use crate::cli::Cli;
use crate::download::{self, DownloadResult, DownloadStatus, Downloader};
use crate::extract::{Extractor, ImageCandidate};
use crate::fetch::PageFetcher;
use crate::filter::{Classifier, Decision};

/// Fetch one page, extract and classify its image URLs, download the
/// accepted ones, then renumber by discovered sort order.
pub async fn grab(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => GrabConfig::load_from_file(path)?,
        None => GrabConfig::load_default()?,
    };

    // Command line parameters override the configuration
    if let Some(output) = cli.output {
        config.download.output_dir = output;
    }
    if let Some(delay) = cli.delay {
        config.download.delay_secs = delay;
    }

    let raw_url = match cli.url {
        Some(url) => url,
        None => {
            warn!("No URL given, using configured fallback: {}", config.fetch.fallback_url);
            config.fetch.fallback_url.clone()
        }
    };
    let page_url = Url::parse(&raw_url).context(format!("Invalid URL: {}", raw_url))?;

    let fetcher = PageFetcher::new(&config.fetch)?;
    let classifier = Classifier::new(&config.filter);
    let downloader = Downloader::new(fetcher.client().clone(), config.download.delay_secs);
    let save_dir = download::save_directory(&page_url, &config.download.output_dir);

    info!("Target page: {}", page_url);
    info!("Save directory: {}", save_dir.display());

    let mut results: Vec<DownloadResult> = Vec::new();

    let accepted = if is_direct_image(&page_url, &config) {
        // The target URL is itself an image, no page to parse
        info!("URL points directly at an image, downloading it as-is");
        vec![ImageCandidate::new(page_url.clone())]
    } else {
        let page = fetcher
            .fetch_page(&page_url)
            .await
            .context("Failed to fetch page")?;

        let extractor = Extractor::new(config.download.guess_limit);
        let candidates = extractor.extract(&page, &page_url);
        info!("Found {} candidate image URLs", candidates.len());

        let mut accepted = Vec::new();
        for candidate in candidates {
            match classifier.classify(&candidate.url) {
                Decision::Accept => {
                    debug!("Accept {}", candidate.url);
                    accepted.push(candidate);
                }
                Decision::Skip(reason) => {
                    debug!("Skip {} ({})", candidate.url, reason);
                    results.push(DownloadResult::skipped(candidate.url));
                }
            }
        }
        accepted
    };

    results.extend(downloader.download_all(&accepted, &save_dir).await?);

    download::rename::rename_by_sort_order(&results, &save_dir)?;

    if cli.zip {
        match archive::create_zip(&save_dir) {
            Ok(Some(path)) => info!("Archive written to {}", path.display()),
            Ok(None) => warn!("Save directory is empty, skipping archive"),
            Err(e) => warn!("Archiving failed: {:#}", e),
        }
    }

    print_summary(&results, &save_dir);

    // Individual download failures are a normal outcome; only an unreachable
    // page aborts the run
    Ok(())
}

/// True when the target URL's own path ends in a supported image extension
fn is_direct_image(url: &Url, config: &GrabConfig) -> bool {
    let path = url.path().to_lowercase();
    config
        .filter
        .image_extensions
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)))
}

fn print_summary(results: &[DownloadResult], save_dir: &Path) {
    let count = |status: DownloadStatus| {
        results.iter().filter(|r| r.status == status).count()
    };
    let success = count(DownloadStatus::Success);
    let failed = count(DownloadStatus::Failed);
    let skipped = count(DownloadStatus::Skipped);
    let bytes: u64 = results.iter().map(|r| r.bytes).sum();

    println!("{}", "=".repeat(60));
    println!("Download finished");
    println!("  Saved to: {}", save_dir.display());
    println!("  Success: {} ({} bytes)", success, bytes);
    println!("  Failed:  {}", failed);
    println!("  Skipped: {}", skipped);
    println!("{}", "=".repeat(60));
}

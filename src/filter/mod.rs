use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;
use url::Url;

use crate::cli::config::FilterSettings;

/// Why a candidate was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    IcoFile,
    NoisePattern,
    UnsupportedExtension,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::IcoFile => write!(f, "ico file"),
            SkipReason::NoisePattern => write!(f, "noise pattern"),
            SkipReason::UnsupportedExtension => write!(f, "unsupported extension"),
        }
    }
}

/// Classification outcome for one candidate URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Skip(SkipReason),
}

/// Decides whether a discovered URL is real content or icon/UI noise.
/// Pure inspection of the URL, no I/O.
pub struct Classifier {
    noise_patterns: Vec<Regex>,
    skip_filenames: Vec<String>,
    image_extensions: HashSet<String>,
}

impl Classifier {
    pub fn new(settings: &FilterSettings) -> Self {
        // Compile the configured noise patterns, dropping invalid ones
        let noise_patterns = settings
            .noise_patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!("Invalid noise pattern '{}': {}", pattern, e);
                    None
                }
            })
            .collect();

        let skip_filenames = settings
            .skip_filenames
            .iter()
            .map(|name| name.to_lowercase())
            .collect();

        let image_extensions = settings
            .image_extensions
            .iter()
            .map(|ext| ext.to_lowercase())
            .collect();

        Self {
            noise_patterns,
            skip_filenames,
            image_extensions,
        }
    }

    /// Classify a candidate URL. The query string never takes part in the
    /// decision; only the path's final segment does.
    pub fn classify(&self, url: &Url) -> Decision {
        let path = url.path().to_lowercase();
        let filename = path.rsplit('/').next().unwrap_or("").to_string();

        if extension_of(&filename) == Some("ico") {
            return Decision::Skip(SkipReason::IcoFile);
        }

        for pattern in &self.noise_patterns {
            if pattern.is_match(&filename) {
                return Decision::Skip(SkipReason::NoisePattern);
            }
        }

        for skip_name in &self.skip_filenames {
            if filename == *skip_name || path.ends_with(&format!("/{}", skip_name)) {
                return Decision::Skip(SkipReason::NoisePattern);
            }
        }

        match extension_of(&filename) {
            Some(ext) if self.image_extensions.contains(ext) => Decision::Accept,
            _ => Decision::Skip(SkipReason::UnsupportedExtension),
        }
    }
}

/// Extension of a filename, if one can be extracted
fn extension_of(filename: &str) -> Option<&str> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::GrabConfig;

    fn classifier() -> Classifier {
        Classifier::new(&GrabConfig::default().filter)
    }

    fn classify(url: &str) -> Decision {
        classifier().classify(&Url::parse(url).unwrap())
    }

    #[test]
    fn skips_ico_files_in_any_case() {
        assert_eq!(
            classify("https://example.com/favicon.ico"),
            Decision::Skip(SkipReason::IcoFile)
        );
        assert_eq!(
            classify("https://example.com/FAVICON.ICO"),
            Decision::Skip(SkipReason::IcoFile)
        );
        assert_eq!(
            classify("https://example.com/site.Ico?v=3"),
            Decision::Skip(SkipReason::IcoFile)
        );
    }

    #[test]
    fn skips_noise_filenames_regardless_of_extension() {
        assert_eq!(
            classify("https://example.com/assets/blank.gif"),
            Decision::Skip(SkipReason::NoisePattern)
        );
        assert_eq!(
            classify("https://example.com/apple-touch-icon.png"),
            Decision::Skip(SkipReason::NoisePattern)
        );
        assert_eq!(
            classify("https://example.com/favicon-32x32.png"),
            Decision::Skip(SkipReason::NoisePattern)
        );
        assert_eq!(
            classify("https://example.com/img/iphone.png"),
            Decision::Skip(SkipReason::NoisePattern)
        );
        // icon\.png$ is unanchored at the front, so suffixed names match too
        assert_eq!(
            classify("https://example.com/theme/app-icon.png"),
            Decision::Skip(SkipReason::NoisePattern)
        );
    }

    #[test]
    fn accepts_supported_content_images() {
        for url in [
            "https://example.com/photo.jpg",
            "https://example.com/photo.JPEG",
            "https://example.com/art.webp?w=900",
            "https://example.com/diagram.svg",
        ] {
            assert_eq!(classify(url), Decision::Accept, "{}", url);
        }
    }

    #[test]
    fn skips_non_image_resources() {
        assert_eq!(
            classify("https://example.com/app.js"),
            Decision::Skip(SkipReason::UnsupportedExtension)
        );
        assert_eq!(
            classify("https://example.com/style.css"),
            Decision::Skip(SkipReason::UnsupportedExtension)
        );
    }

    #[test]
    fn skips_urls_without_an_extension() {
        assert_eq!(
            classify("https://example.com/images/view"),
            Decision::Skip(SkipReason::UnsupportedExtension)
        );
        assert_eq!(
            classify("https://example.com/"),
            Decision::Skip(SkipReason::UnsupportedExtension)
        );
    }

    #[test]
    fn query_string_does_not_hide_the_extension() {
        assert_eq!(classify("https://example.com/a.png?session=.js"), Decision::Accept);
    }
}

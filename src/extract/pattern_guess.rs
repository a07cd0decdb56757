use regex::Regex;
use tracing::warn;
use url::Url;

use super::{resolve_url, ExtractLayer, ImageCandidate, SortKey, IMAGE_EXT_PATTERN};

/// Last-resort layer: when nothing was found in the page content, guess
/// sibling URLs from the page URL itself. Applies only when the final path
/// segment is `<stem><digits>.<image-ext>`; the numeric run is substituted
/// with 1..=limit, preserving its zero padding. Output is low-confidence by
/// construction.
pub struct PatternGuess {
    limit: u32,
    numbered_tail: Regex,
}

impl PatternGuess {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            numbered_tail: Regex::new(&format!(
                r"(?i)^(.*?)(\d+)\.({IMAGE_EXT_PATTERN})$"
            ))
            .expect("hardcoded pattern compiles"),
        }
    }
}

impl ExtractLayer for PatternGuess {
    fn name(&self) -> &'static str {
        "pattern-guess"
    }

    fn try_extract(&self, _page: &str, base: &Url) -> Vec<ImageCandidate> {
        let Some(last_segment) = base
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|s| !s.is_empty())
        else {
            return Vec::new();
        };

        let Some(captures) = self.numbered_tail.captures(last_segment) else {
            return Vec::new();
        };

        let stem = &captures[1];
        let width = captures[2].len();
        let extension = &captures[3];

        warn!(
            "Guessing up to {} sibling URLs from '{}'; results are low confidence",
            self.limit, last_segment
        );

        let mut found = Vec::new();
        for n in 1..=i64::from(self.limit) {
            let name = format!("{stem}{n:0width$}.{extension}");
            if let Some(url) = resolve_url(base, &name) {
                found.push(ImageCandidate::with_sort_key(url, SortKey::Numeric(n)));
            }
        }

        found
    }
}

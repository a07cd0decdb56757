pub mod generic;
pub mod pattern_guess;
pub mod reader_area;
pub mod script_listing;

use std::collections::HashMap;
use tracing::{debug, info};
use url::Url;

/// Extension alternation used by the extraction regexes. Classification of
/// what is actually downloadable happens later in the filter module; the
/// extractor casts a wide net on purpose.
pub const IMAGE_EXT_PATTERN: &str = "jpg|jpeg|png|gif|webp|bmp|svg";

/// Ordering hint discovered in site metadata, used to renumber files after
/// download. Numeric keys sort ascending and before any text key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Numeric(i64),
    Text(String),
}

impl SortKey {
    /// Parse a raw metadata value, preferring the numeric form
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => SortKey::Numeric(n),
            Err(_) => SortKey::Text(raw.trim().to_string()),
        }
    }
}

/// A discovered, not-yet-classified image URL
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    /// Absolute URL of the image
    pub url: Url,

    /// Ordering hint, when the page provided one
    pub sort_key: Option<SortKey>,
}

impl ImageCandidate {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            sort_key: None,
        }
    }

    pub fn with_sort_key(url: Url, sort_key: SortKey) -> Self {
        Self {
            url,
            sort_key: Some(sort_key),
        }
    }
}

/// Insertion-ordered, URL-unique collection of candidates.
///
/// Uniqueness is judged on the normalized URL form; the first occurrence
/// wins. A later duplicate only contributes its sort key when the first
/// occurrence had none.
#[derive(Debug, Default)]
pub struct CandidateSet {
    entries: Vec<ImageCandidate>,
    index: HashMap<String, usize>,
}

impl CandidateSet {
    pub fn insert(&mut self, candidate: ImageCandidate) {
        let key = normalize_url(&candidate.url);

        match self.index.get(&key) {
            Some(&pos) => {
                let existing = &mut self.entries[pos];
                if existing.sort_key.is_none() && candidate.sort_key.is_some() {
                    existing.sort_key = candidate.sort_key;
                }
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(candidate);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageCandidate> {
        self.entries.iter()
    }
}

impl IntoIterator for CandidateSet {
    type Item = ImageCandidate;
    type IntoIter = std::vec::IntoIter<ImageCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// One strategy within the layered extraction pipeline
pub trait ExtractLayer {
    fn name(&self) -> &'static str;

    /// Attempt to locate image URLs in the page. Malformed content is never
    /// an error; a layer that finds nothing returns an empty list.
    fn try_extract(&self, page: &str, base: &Url) -> Vec<ImageCandidate>;
}

/// Runs the extraction layers in priority order and merges their output
pub struct Extractor {
    layers: Vec<Box<dyn ExtractLayer>>,
    guess: pattern_guess::PatternGuess,
}

impl Extractor {
    pub fn new(guess_limit: u32) -> Self {
        Self {
            layers: vec![
                Box::new(reader_area::ReaderArea::new()),
                Box::new(script_listing::ScriptListing::new()),
                Box::new(generic::GenericScan::new()),
            ],
            guess: pattern_guess::PatternGuess::new(guess_limit),
        }
    }

    /// Extract every candidate image URL the layers can find.
    ///
    /// All regular layers run and their results merge with deduplication.
    /// The pattern-guess fallback is only consulted when the merged result
    /// is empty.
    pub fn extract(&self, page: &str, base: &Url) -> CandidateSet {
        let mut set = CandidateSet::default();

        for layer in &self.layers {
            let found = layer.try_extract(page, base);
            debug!("Extraction layer '{}' found {} URLs", layer.name(), found.len());
            for candidate in found {
                set.insert(candidate);
            }
        }

        if set.is_empty() {
            info!("No image URLs in page content, trying low-confidence URL pattern guess");
            for candidate in self.guess.try_extract(page, base) {
                set.insert(candidate);
            }
        }

        set
    }
}

/// Normalize a URL for deduplication: fragment dropped, query parameters
/// sorted, trailing slash trimmed. Scheme and host are already lowercased
/// by the url crate and default ports are omitted from the serialized form.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);

    let mut pairs: Vec<(String, String)> = normalized
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if pairs.is_empty() {
        normalized.set_query(None);
    } else {
        pairs.sort();
        // Re-encode the sorted pairs; joining the decoded values directly
        // would conflate values that contain '&' or '='
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&pairs)
            .finish();
        normalized.set_query(Some(&query));
    }

    let mut out = normalized.to_string();
    if normalized.query().is_none() {
        while out.ends_with('/') && !out.ends_with("://") {
            out.pop();
        }
    }

    out
}

/// Resolve a raw reference found in page content against the page URL.
/// Handles relative paths and protocol-relative `//host/path` forms; only
/// http(s) results are kept.
pub(crate) fn resolve_url(base: &Url, raw: &str) -> Option<Url> {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    if trimmed.is_empty() {
        return None;
    }

    let resolved = base.join(trimmed).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

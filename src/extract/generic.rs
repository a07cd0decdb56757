use regex::Regex;
use scraper::{Html, Node};
use url::Url;

use super::{resolve_url, ExtractLayer, ImageCandidate, SortKey, IMAGE_EXT_PATTERN};

/// Lazy-load attributes commonly holding the real image URL
const LAZY_ATTRS: &[&str] = &[
    "data-src",
    "data-url",
    "data-image",
    "data-img",
    "data-pic",
    "data-srcset",
];

/// Site-agnostic layer: scans `<img>` tags and lazy-load attributes, CSS
/// `url(...)` references in style attributes and `<style>` blocks, and any
/// quoted string literal in the raw source that looks like an image path
/// (the last one catches URLs buried in inline scripts).
pub struct GenericScan {
    css_url: Regex,
    quoted_image: Regex,
}

impl GenericScan {
    pub fn new() -> Self {
        Self {
            css_url: Regex::new(&format!(
                r#"(?i)url\(\s*["']?([^"')\s]+\.(?:{IMAGE_EXT_PATTERN})(?:\?[^"')\s]*)?)["']?\s*\)"#
            ))
            .expect("hardcoded pattern compiles"),
            quoted_image: Regex::new(&format!(
                r#"(?i)["']([^"'<>\s]+\.(?:{IMAGE_EXT_PATTERN})(?:\?[^"'<>\s]*)?)["']"#
            ))
            .expect("hardcoded pattern compiles"),
        }
    }

    fn push(
        &self,
        found: &mut Vec<ImageCandidate>,
        base: &Url,
        raw: &str,
        sort_key: Option<SortKey>,
    ) {
        if let Some(url) = resolve_url(base, raw) {
            found.push(ImageCandidate { url, sort_key });
        }
    }
}

impl ExtractLayer for GenericScan {
    fn name(&self) -> &'static str {
        "generic-scan"
    }

    fn try_extract(&self, page: &str, base: &Url) -> Vec<ImageCandidate> {
        let mut found = Vec::new();
        let document = Html::parse_document(page);

        for node in document.tree.nodes() {
            let Node::Element(element) = node.value() else {
                continue;
            };

            // An explicit data-sort attribute orders the element's image
            let sort_key = element.attr("data-sort").map(SortKey::parse);

            if element.name() == "img" {
                if let Some(src) = element.attr("src") {
                    self.push(&mut found, base, src, sort_key.clone());
                }
            }

            for attr in LAZY_ATTRS {
                if let Some(value) = element.attr(attr) {
                    // srcset-style values list alternatives; take the first
                    let first = value
                        .split(',')
                        .next()
                        .unwrap_or(value)
                        .split_whitespace()
                        .next()
                        .unwrap_or("");
                    self.push(&mut found, base, first, sort_key.clone());
                }
            }

            // Inline style attribute backgrounds
            if let Some(style) = element.attr("style") {
                for captures in self.css_url.captures_iter(style) {
                    self.push(&mut found, base, &captures[1], None);
                }
            }

            // <style> block backgrounds
            if element.name() == "style" {
                for child in node.children() {
                    if let Node::Text(text) = child.value() {
                        for captures in self.css_url.captures_iter(text) {
                            self.push(&mut found, base, &captures[1], None);
                        }
                    }
                }
            }
        }

        // Quoted image paths anywhere in the source, inline scripts included
        for captures in self.quoted_image.captures_iter(page) {
            self.push(&mut found, base, &captures[1], None);
        }

        found
    }
}

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use super::{resolve_url, ExtractLayer, ImageCandidate, SortKey};

/// Container element the reader pages render their image list into
const CONTAINER_MARKER: &str = "show_image_area";

/// Attributes that may hold an element's image URL, in preference order
const URL_ATTRS: &[&str] = &["src", "data-src", "data-url", "data-image"];

/// Site-specific layer for reader pages that render their images as numbered
/// elements (`read_online_image_1`, `read_online_image_2`, ...) inside a
/// `show_image_area` container. The element number is the display order and
/// becomes the sort key. Elements are matched by id or `data-image-id`; the
/// URL comes from the element's own attributes, a nested `<img>`, or a CSS
/// `background-image`.
pub struct ReaderArea {
    numbered_id: Regex,
    background_url: Regex,
}

impl ReaderArea {
    pub fn new() -> Self {
        Self {
            numbered_id: Regex::new(r"(?i)read_online_image_(\d+)")
                .expect("hardcoded pattern compiles"),
            background_url: Regex::new(
                r#"(?i)background-image\s*:\s*url\(\s*["']?([^"'()\s]+)["']?\s*\)"#,
            )
            .expect("hardcoded pattern compiles"),
        }
    }

    /// Number of a reader element, from its id or `data-image-id`
    fn element_number(&self, element: &scraper::node::Element) -> Option<i64> {
        for attr in ["id", "data-image-id"] {
            if let Some(value) = element.attr(attr) {
                if let Some(captures) = self.numbered_id.captures(value) {
                    return captures[1].parse().ok();
                }
            }
        }
        None
    }

    /// Image URL of a numbered element: own attributes first, then a nested
    /// `<img>`, then an inline background
    fn image_url_of(&self, element_ref: ElementRef<'_>) -> Option<String> {
        let element = element_ref.value();

        for attr in URL_ATTRS {
            if let Some(value) = element.attr(attr) {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }

        for descendant in element_ref.descendants() {
            let Some(child) = ElementRef::wrap(descendant) else {
                continue;
            };
            if child.value().name() != "img" {
                continue;
            }
            for attr in URL_ATTRS {
                if let Some(value) = child.value().attr(attr) {
                    if !value.is_empty() {
                        return Some(value.to_string());
                    }
                }
            }
        }

        if let Some(style) = element.attr("style") {
            if let Some(captures) = self.background_url.captures(style) {
                return Some(captures[1].to_string());
            }
        }

        None
    }
}

impl ExtractLayer for ReaderArea {
    fn name(&self) -> &'static str {
        "reader-area"
    }

    fn try_extract(&self, page: &str, base: &Url) -> Vec<ImageCandidate> {
        let document = Html::parse_document(page);

        let Some(container) = document.tree.nodes().find_map(|node| {
            let element_ref = ElementRef::wrap(node)?;
            let element = element_ref.value();
            let marked = element.attr("id") == Some(CONTAINER_MARKER)
                || element
                    .attr("class")
                    .map_or(false, |class| class.contains(CONTAINER_MARKER));
            marked.then_some(element_ref)
        }) else {
            return Vec::new();
        };

        let mut numbered: Vec<(i64, String)> = Vec::new();
        for descendant in container.descendants() {
            let Some(element_ref) = ElementRef::wrap(descendant) else {
                continue;
            };
            let Some(number) = self.element_number(element_ref.value()) else {
                continue;
            };
            if let Some(raw) = self.image_url_of(element_ref) {
                numbered.push((number, raw));
            }
        }

        debug!("Found {} numbered reader elements", numbered.len());

        // Element numbers are the display order, not the DOM order
        numbered.sort_by_key(|(number, _)| *number);

        numbered
            .into_iter()
            .filter_map(|(number, raw)| {
                resolve_url(base, &raw)
                    .map(|url| ImageCandidate::with_sort_key(url, SortKey::Numeric(number)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/reader/42").unwrap()
    }

    #[test]
    fn numbered_elements_come_out_in_display_order() {
        // DOM order deliberately disagrees with the element numbers
        let page = r#"
            <div id="show_image_area">
              <img id="read_online_image_2" src="/pages/two.jpg">
              <img id="read_online_image_1" src="/pages/one.jpg">
              <img id="read_online_image_3" src="/pages/three.jpg">
            </div>
        "#;

        let found = ReaderArea::new().try_extract(page, &base());

        assert_eq!(found.len(), 3);
        assert_eq!(found[0].url.as_str(), "https://example.com/pages/one.jpg");
        assert_eq!(found[0].sort_key, Some(SortKey::Numeric(1)));
        assert_eq!(found[1].url.as_str(), "https://example.com/pages/two.jpg");
        assert_eq!(found[2].url.as_str(), "https://example.com/pages/three.jpg");
        assert_eq!(found[2].sort_key, Some(SortKey::Numeric(3)));
    }

    #[test]
    fn wrapper_elements_yield_nested_img_or_background() {
        let page = r#"
            <div class="viewer show_image_area">
              <div id="read_online_image_1"><img data-src="/lazy/one.webp"></div>
              <div id="read_online_image_2"
                   style="background-image: url('/bg/two.png')"></div>
            </div>
        "#;

        let found = ReaderArea::new().try_extract(page, &base());

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].url.as_str(), "https://example.com/lazy/one.webp");
        assert_eq!(found[1].url.as_str(), "https://example.com/bg/two.png");
        assert_eq!(found[1].sort_key, Some(SortKey::Numeric(2)));
    }

    #[test]
    fn data_image_id_attribute_also_identifies_elements() {
        let page = r#"
            <div id="show_image_area">
              <img data-image-id="read_online_image_7" src="/pages/seven.jpg">
            </div>
        "#;

        let found = ReaderArea::new().try_extract(page, &base());

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].sort_key, Some(SortKey::Numeric(7)));
    }

    #[test]
    fn elements_outside_the_container_are_ignored() {
        let page = r#"
            <img id="read_online_image_1" src="/stray.jpg">
            <div id="unrelated"><img src="/other.jpg"></div>
        "#;

        assert!(ReaderArea::new().try_extract(page, &base()).is_empty());
    }
}

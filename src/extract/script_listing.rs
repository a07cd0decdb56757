use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use super::{resolve_url, ExtractLayer, ImageCandidate, SortKey, IMAGE_EXT_PATTERN};

/// Width suffix the reader pages append between the stored filename and the
/// extension, e.g. `abc123_w900.jpg`.
const IMAGE_WIDTH_SUFFIX: &str = "_w900";

/// Site-specific layer for reader pages that ship their image listing inside
/// an embedded script: a `HTTP_IMAGE` base URL plus an `Original_Image_List`
/// array of descriptors carrying `sort`, `new_filename` and `extension`
/// fields. Also picks up the generic quoted-URL arrays (`imageList`,
/// `imgList`, ...) some galleries embed instead.
pub struct ScriptListing {
    http_image: Regex,
    image_list: Regex,
    descriptor: Regex,
    quoted_arrays: Regex,
    quoted_image: Regex,
}

impl ScriptListing {
    pub fn new() -> Self {
        Self {
            http_image: Regex::new(r#"var\s+HTTP_IMAGE\s*=\s*"([^"]+)";"#)
                .expect("hardcoded pattern compiles"),
            image_list: Regex::new(r"(?s)Original_Image_List\s*=\s*(\[.*?\])\s*;")
                .expect("hardcoded pattern compiles"),
            descriptor: Regex::new(
                r#""sort"\s*:\s*"?(\d+)"?[^{}]*?"new_filename"\s*:\s*"([^"]+)"[^{}]*?"extension"\s*:\s*"([^"]+)""#,
            )
            .expect("hardcoded pattern compiles"),
            quoted_arrays: Regex::new(
                r"(?is)(?:imageList|images|imgList|imageArray|picList)\s*[:=]\s*\[(.*?)\]",
            )
            .expect("hardcoded pattern compiles"),
            quoted_image: Regex::new(&format!(
                r#"(?i)["']([^"']+\.(?:{IMAGE_EXT_PATTERN}))["']"#
            ))
            .expect("hardcoded pattern compiles"),
        }
    }

    /// Parse the descriptor array, preferring real JSON and falling back to
    /// a per-object regex when the embedded script is not quite valid JSON.
    fn parse_listing(&self, listing: &str, http_image: &str, base: &Url) -> Vec<ImageCandidate> {
        let mut found = Vec::new();

        match serde_json::from_str::<Vec<serde_json::Value>>(listing) {
            Ok(descriptors) => {
                for descriptor in &descriptors {
                    let Some(filename) = descriptor.get("new_filename").and_then(|v| v.as_str())
                    else {
                        continue;
                    };
                    if filename.is_empty() {
                        continue;
                    }

                    let extension = descriptor
                        .get("extension")
                        .and_then(|v| v.as_str())
                        .unwrap_or("jpg");

                    let sort_key = descriptor.get("sort").and_then(|v| {
                        v.as_i64()
                            .map(SortKey::Numeric)
                            .or_else(|| v.as_str().map(SortKey::parse))
                    });

                    let raw = format!("{http_image}{filename}{IMAGE_WIDTH_SUFFIX}.{extension}");
                    if let Some(url) = resolve_url(base, &raw) {
                        found.push(ImageCandidate { url, sort_key });
                    }
                }
            }
            Err(e) => {
                warn!("Image listing is not valid JSON ({}), falling back to regex", e);
                for captures in self.descriptor.captures_iter(listing) {
                    let raw = format!(
                        "{http_image}{}{IMAGE_WIDTH_SUFFIX}.{}",
                        &captures[2], &captures[3]
                    );
                    if let Some(url) = resolve_url(base, &raw) {
                        found.push(ImageCandidate {
                            url,
                            sort_key: Some(SortKey::parse(&captures[1])),
                        });
                    }
                }
            }
        }

        found
    }
}

impl ExtractLayer for ScriptListing {
    fn name(&self) -> &'static str {
        "script-listing"
    }

    fn try_extract(&self, page: &str, base: &Url) -> Vec<ImageCandidate> {
        let mut found = Vec::new();

        // Reader-page listing with sort metadata
        if let Some(http_image) = self.http_image.captures(page).map(|c| c[1].to_string()) {
            if let Some(listing) = self.image_list.captures(page).map(|c| c[1].to_string()) {
                debug!("Found embedded image listing with base {}", http_image);
                found = self.parse_listing(&listing, &http_image, base);
            }
        }

        // Generic quoted-URL arrays, no ordering metadata
        for array in self.quoted_arrays.captures_iter(page) {
            for quoted in self.quoted_image.captures_iter(&array[1]) {
                if let Some(url) = resolve_url(base, &quoted[1]) {
                    found.push(ImageCandidate::new(url));
                }
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/readOnline2.php?ID=156900").unwrap()
    }

    #[test]
    fn parses_reader_listing_with_sort_keys() {
        let page = r#"
            <script>
            var HTTP_IMAGE = "https://img.example.net/comic/thumbnail/158000/d-156900/";
            Original_Image_List = [
                {"sort":"2","comic_id":"156900","new_filename":"bbb","extension":"png","version":"1"},
                {"sort":"1","comic_id":"156900","new_filename":"aaa","extension":"jpg","version":"1"}
            ];
            </script>
        "#;

        let layer = ScriptListing::new();
        let found = layer.try_extract(page, &base());

        assert_eq!(found.len(), 2);
        assert_eq!(
            found[0].url.as_str(),
            "https://img.example.net/comic/thumbnail/158000/d-156900/bbb_w900.png"
        );
        assert_eq!(found[0].sort_key, Some(SortKey::Numeric(2)));
        assert_eq!(
            found[1].url.as_str(),
            "https://img.example.net/comic/thumbnail/158000/d-156900/aaa_w900.jpg"
        );
        assert_eq!(found[1].sort_key, Some(SortKey::Numeric(1)));
    }

    #[test]
    fn falls_back_to_regex_on_malformed_json() {
        // Trailing comma makes this invalid JSON
        let page = r#"
            var HTTP_IMAGE = "https://img.example.net/d-1/";
            Original_Image_List = [{"sort":"5","comic_id":"1","ext_path_folder":"","new_filename":"xyz","extension":"jpg","version":"1"},];
        "#;

        let layer = ScriptListing::new();
        let found = layer.try_extract(page, &base());

        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].url.as_str(),
            "https://img.example.net/d-1/xyz_w900.jpg"
        );
        assert_eq!(found[0].sort_key, Some(SortKey::Numeric(5)));
    }

    #[test]
    fn picks_up_quoted_image_arrays_without_sort_keys() {
        let page = r#"
            <script>
            var imgList = ["/gallery/one.jpg", "/gallery/two.png"];
            </script>
        "#;

        let layer = ScriptListing::new();
        let found = layer.try_extract(page, &base());

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].url.as_str(), "https://example.com/gallery/one.jpg");
        assert!(found[0].sort_key.is_none());
        assert_eq!(found[1].url.as_str(), "https://example.com/gallery/two.png");
    }

    #[test]
    fn finds_nothing_on_unrelated_markup() {
        let layer = ScriptListing::new();
        assert!(layer
            .try_extract("<html><body>plain page</body></html>", &base())
            .is_empty());
    }
}

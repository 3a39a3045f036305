//! Metadata Extractor
//!
//! Produces a title and a representative image from fetched page content.
//! Two formats are understood: rendered HTML (parsed with `scraper`) and the
//! Markdown-like text returned by text-extraction proxies. Extraction never
//! fails; anything unusable degrades to the placeholder title and no image.

use linkshelf_core::canonical::resolve_against;
use linkshelf_core::{MetadataResult, MetadataSource, PLACEHOLDER_TITLE};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::image_scorer::{is_likely_image, ImageScorer, ScoreOptions};

static TITLE_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*Title:[ \t]*(\S.*?)[ \t]*\r?$").unwrap());

static MARKDOWN_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#).unwrap()
});

static RAW_IMAGE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://[^\s"'<>()\[\]]+?\.(?:png|jpe?g|gif|webp|avif|svg)(?:\?[^\s"'<>()\[\]]*)?"#)
        .unwrap()
});

/// Meta keys that may carry a page image, in priority order
const META_IMAGE_KEYS: &[&str] = &[
    "og:image",
    "og:image:url",
    "og:image:secure_url",
    "twitter:image",
    "twitter:image:src",
    "image",
    "thumbnailurl",
];

/// Attributes of `<img>` that may hold the real source, lazy-loading included
const IMG_SOURCE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];

/// Separators after which a page title usually carries the site name
const TITLE_SEPARATORS: &[&str] = &[" - ", " | "];

/// Format of fetched content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Html,
    Markdown,
}

/// Configuration for the metadata extractor
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Longest title kept, in characters, ellipsis included
    pub max_title_chars: usize,
    /// Number of `<img>` elements inspected when meta tags give nothing
    pub max_img_elements: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_title_chars: 150,
            max_img_elements: 40,
        }
    }
}

/// Title and image extractor for HTML and Markdown content
pub struct MetadataExtractor {
    scorer: ImageScorer,
    config: ExtractorConfig,
}

impl MetadataExtractor {
    /// Create an extractor with default configuration and weights
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default(), ImageScorer::new())
    }

    pub fn with_config(config: ExtractorConfig, scorer: ImageScorer) -> Self {
        Self { scorer, config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract from raw bytes, decoding them as lossy UTF-8
    pub fn extract_bytes(&self, content: &[u8], source_url: &str, format: ContentFormat) -> MetadataResult {
        self.extract(&String::from_utf8_lossy(content), source_url, format)
    }

    /// Extract a title and image from content fetched for `source_url`
    pub fn extract(&self, content: &str, source_url: &str, format: ContentFormat) -> MetadataResult {
        let (title, image, source) = match format {
            ContentFormat::Markdown => {
                let (title, image) = self.extract_markdown(content, source_url);
                (title, image, MetadataSource::Markdown)
            }
            ContentFormat::Html => {
                let (title, image) = self.extract_html(content, source_url);
                (title, image, MetadataSource::Html)
            }
        };

        let title = title
            .map(|t| clean_title(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string());

        MetadataResult {
            title: Some(truncate_title(&title, self.config.max_title_chars)),
            image: image.and_then(|img| finalize_image(source_url, &img)),
            url: source_url.to_string(),
            source,
        }
    }

    fn extract_markdown(&self, content: &str, source_url: &str) -> (Option<String>, Option<String>) {
        let title = TITLE_LINE_RE
            .captures(content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        let mut candidates: Vec<String> = MARKDOWN_IMAGE_RE
            .captures_iter(content)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect();
        if candidates.is_empty() {
            if let Some(raw) = RAW_IMAGE_URL_RE.find(content) {
                candidates.push(raw.as_str().to_string());
            }
        }

        let image = self
            .scorer
            .pick_best(source_url, &candidates, ScoreOptions::same_host_only());
        (title, image)
    }

    fn extract_html(&self, content: &str, source_url: &str) -> (Option<String>, Option<String>) {
        let document = Html::parse_document(content);

        let title = html_title(&document).map(|t| strip_site_suffix(&t));

        let meta_candidates = meta_image_candidates(&document);
        let mut image = self
            .scorer
            .pick_best(source_url, &meta_candidates, ScoreOptions::meta_tags());

        if image.is_none() {
            let img_candidates = img_element_candidates(&document, self.config.max_img_elements);
            tracing::trace!(
                meta = meta_candidates.len(),
                img = img_candidates.len(),
                "no meta image selected, scoring <img> elements"
            );
            image = self
                .scorer
                .pick_best(source_url, &img_candidates, ScoreOptions::same_host_only());
        }

        (title, image)
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Contents of every `<meta>` whose property, name or itemprop equals `key`
fn meta_values(document: &Html, key: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse("meta") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter(|el| {
            ["property", "name", "itemprop"].iter().any(|attr| {
                el.value()
                    .attr(attr)
                    .map(|v| v.trim().eq_ignore_ascii_case(key))
                    .unwrap_or(false)
            })
        })
        .filter_map(|el| el.value().attr("content"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn first_meta(document: &Html, key: &str) -> Option<String> {
    meta_values(document, key).into_iter().next()
}

/// Title by priority: og:title, twitter:title, meta title, then `<title>`
fn html_title(document: &Html) -> Option<String> {
    first_meta(document, "og:title")
        .or_else(|| first_meta(document, "twitter:title"))
        .or_else(|| first_meta(document, "title"))
        .or_else(|| {
            let selector = Selector::parse("title").ok()?;
            let text: String = document.select(&selector).next()?.text().collect();
            let text = text.trim().to_string();
            (!text.is_empty()).then_some(text)
        })
}

fn meta_image_candidates(document: &Html) -> Vec<String> {
    META_IMAGE_KEYS
        .iter()
        .flat_map(|key| meta_values(document, key))
        .collect()
}

fn img_element_candidates(document: &Html, limit: usize) -> Vec<String> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };
    let mut candidates = Vec::new();
    for img in document.select(&selector).take(limit) {
        let element = img.value();
        for attr in IMG_SOURCE_ATTRS {
            if let Some(value) = element.attr(attr) {
                let value = value.trim();
                if !value.is_empty() {
                    candidates.push(value.to_string());
                }
            }
        }
        for attr in ["srcset", "data-srcset"] {
            if let Some(largest) = element.attr(attr).and_then(largest_srcset_entry) {
                candidates.push(largest);
            }
        }
    }
    candidates
}

/// URL of the widest entry in a `srcset` attribute
///
/// Entries are `url [descriptor]` pairs separated by commas. Entries without
/// a `w` descriptor count as width 0; ties keep the earlier entry.
pub fn largest_srcset_entry(srcset: &str) -> Option<String> {
    let mut entries: Vec<(String, u32)> = Vec::new();
    let mut current: Option<String> = None;
    let mut width = 0u32;

    let mut finish = |url: &mut Option<String>, width: &mut u32| {
        if let Some(url) = url.take() {
            entries.push((url, *width));
        }
        *width = 0;
    };

    for token in srcset.split_whitespace() {
        if current.is_none() {
            match token.strip_suffix(',') {
                Some(url) => {
                    current = Some(url.to_string());
                    finish(&mut current, &mut width);
                }
                None => current = Some(token.to_string()),
            }
            continue;
        }

        let (descriptor, next) = match token.split_once(',') {
            Some((descriptor, next)) => (descriptor, Some(next)),
            None => (token, None),
        };
        if let Some(w) = descriptor.strip_suffix('w').and_then(|n| n.parse::<u32>().ok()) {
            width = w;
        }
        if let Some(next) = next {
            finish(&mut current, &mut width);
            if !next.is_empty() {
                current = Some(next.to_string());
            }
        }
    }
    finish(&mut current, &mut width);

    let mut best: Option<&(String, u32)> = None;
    for entry in &entries {
        if entry.0.is_empty() {
            continue;
        }
        match best {
            Some(current) if entry.1 <= current.1 => {}
            _ => best = Some(entry),
        }
    }
    best.map(|(url, _)| url.clone())
}

/// Keep the part of a title before the first ` - ` or ` | `
fn strip_site_suffix(title: &str) -> String {
    let title = title.trim();
    let cut = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| title.find(sep))
        .min();
    match cut {
        Some(index) if !title[..index].trim().is_empty() => title[..index].trim().to_string(),
        _ => title.to_string(),
    }
}

fn clean_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cap a title at `max_chars` characters, ellipsis included
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars || max_chars == 0 {
        return title.to_string();
    }
    let mut truncated: String = title.chars().take(max_chars - 1).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push('…');
    truncated
}

/// Re-resolve a selected image against the page and re-check it
fn finalize_image(source_url: &str, image: &str) -> Option<String> {
    resolve_against(source_url, image).filter(|resolved| is_likely_image(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://site.com/blog/post";

    fn extract_html(html: &str) -> MetadataResult {
        MetadataExtractor::new().extract(html, PAGE, ContentFormat::Html)
    }

    #[test]
    fn test_html_title_priority() {
        let html = r#"<html><head>
            <title>Doc Title</title>
            <meta name="twitter:title" content="Twitter Title">
            <meta property="og:title" content="OG Title">
        </head></html>"#;
        assert_eq!(extract_html(html).title.as_deref(), Some("OG Title"));

        let html = r#"<html><head><title>Doc Title</title><meta name="twitter:title" content="Twitter Title"></head></html>"#;
        assert_eq!(extract_html(html).title.as_deref(), Some("Twitter Title"));

        let html = r#"<html><head><title>  Doc
            Title </title></head></html>"#;
        assert_eq!(extract_html(html).title.as_deref(), Some("Doc Title"));
    }

    #[test]
    fn test_html_title_separator_is_cut() {
        let html = "<title>Great Post | My Blog - Home</title>";
        assert_eq!(extract_html(html).title.as_deref(), Some("Great Post"));

        let html = "<title>Great Post - My Blog | Home</title>";
        assert_eq!(extract_html(html).title.as_deref(), Some("Great Post"));

        let html = "<title>Well-known-title</title>";
        assert_eq!(extract_html(html).title.as_deref(), Some("Well-known-title"));
    }

    #[test]
    fn test_html_placeholder_on_garbage() {
        let result = extract_html("<<<>>> not html at all </div>");
        assert_eq!(result.title.as_deref(), Some(PLACEHOLDER_TITLE));
        assert_eq!(result.image, None);
        assert_eq!(result.source, MetadataSource::Html);
    }

    #[test]
    fn test_html_meta_image_on_cdn_host() {
        let html = r#"<head>
            <meta property="og:image" content="https://cdn.example.net/uploads/cover-1600x900.jpg">
        </head>"#;
        assert_eq!(
            extract_html(html).image.as_deref(),
            Some("https://cdn.example.net/uploads/cover-1600x900.jpg")
        );
    }

    #[test]
    fn test_html_falls_back_to_img_elements() {
        let html = r#"<head><meta property="og:image" content="/favicon.ico"></head>
            <body>
              <img src="/wp-content/themes/x/logo.png">
              <img data-src="/wp-content/uploads/2024/photo-1200x800.jpg" src="data:image/gif;base64,R0lGOD">
              <img src="https://ads.other.net/banner-1200x800.jpg">
            </body>"#;
        assert_eq!(
            extract_html(html).image.as_deref(),
            Some("https://site.com/wp-content/uploads/2024/photo-1200x800.jpg")
        );
    }

    #[test]
    fn test_html_uses_largest_srcset_entry() {
        let html = r#"<body><img srcset="/img/p-400x300.jpg 400w, /img/p-1600x1200.jpg 1600w, /img/p-800x600.jpg 800w"></body>"#;
        assert_eq!(
            extract_html(html).image.as_deref(),
            Some("https://site.com/img/p-1600x1200.jpg")
        );
    }

    #[test]
    fn test_html_meta_png_without_size_hint() {
        let html = r#"<head><meta property="og:image" content="https://site.com/images/og-share.png"></head>"#;
        assert_eq!(
            extract_html(html).image.as_deref(),
            Some("https://site.com/images/og-share.png")
        );
    }

    #[test]
    fn test_html_reads_lazy_loading_attributes() {
        let lazy = r#"<body><img data-lazy-src="/uploads/2024/lazy-1200x800.jpg"></body>"#;
        assert_eq!(
            extract_html(lazy).image.as_deref(),
            Some("https://site.com/uploads/2024/lazy-1200x800.jpg")
        );

        let original = r#"<body><img class="lazy" data-original="/uploads/2024/orig-1200x800.jpg"></body>"#;
        assert_eq!(
            extract_html(original).image.as_deref(),
            Some("https://site.com/uploads/2024/orig-1200x800.jpg")
        );
    }

    #[test]
    fn test_html_uses_data_srcset_alone() {
        let html = r#"<body><img data-srcset="/uploads/s-480x320.jpg 480w, /uploads/s-1920x1080.jpg 1920w, /uploads/s-960x640.jpg 960w"></body>"#;
        assert_eq!(
            extract_html(html).image.as_deref(),
            Some("https://site.com/uploads/s-1920x1080.jpg")
        );
    }

    #[test]
    fn test_img_elements_are_limited() {
        let mut html = String::from("<body>");
        for i in 0..40 {
            html.push_str(&format!("<img src=\"/img/icon-{}.gif\">", i));
        }
        html.push_str("<img src=\"/img/photo-1600x900.jpg\"></body>");
        assert_eq!(extract_html(&html).image, None);
    }

    #[test]
    fn test_largest_srcset_entry() {
        assert_eq!(
            largest_srcset_entry("a.jpg 100w, b.jpg 300w, c.jpg 200w").as_deref(),
            Some("b.jpg")
        );
        assert_eq!(largest_srcset_entry("a.jpg 100w,b.jpg 300w").as_deref(), Some("b.jpg"));
        assert_eq!(largest_srcset_entry("a.jpg, b.jpg 2x").as_deref(), Some("a.jpg"));
        assert_eq!(largest_srcset_entry("single.jpg").as_deref(), Some("single.jpg"));
        assert_eq!(largest_srcset_entry("   "), None);
    }

    #[test]
    fn test_markdown_title_and_images() {
        let md = "Title: Proxy Title\n\nURL Source: https://site.com/blog/post\n\n\
                  ![logo](https://site.com/logo-32x32.png)\n\
                  ![hero](https://site.com/uploads/hero-1600x900.jpg \"Hero\")\n";
        let result = MetadataExtractor::new().extract(md, PAGE, ContentFormat::Markdown);
        assert_eq!(result.title.as_deref(), Some("Proxy Title"));
        assert_eq!(result.image.as_deref(), Some("https://site.com/uploads/hero-1600x900.jpg"));
        assert_eq!(result.source, MetadataSource::Markdown);
    }

    #[test]
    fn test_markdown_raw_url_fallback_and_placeholder() {
        let md = "Some text https://site.com/media/photo-1200x800.jpg more text";
        let result = MetadataExtractor::new().extract(md, PAGE, ContentFormat::Markdown);
        assert_eq!(result.title.as_deref(), Some(PLACEHOLDER_TITLE));
        assert_eq!(result.image.as_deref(), Some("https://site.com/media/photo-1200x800.jpg"));
    }

    #[test]
    fn test_markdown_rejects_other_hosts() {
        let md = "Title: X\n![a](https://elsewhere.org/uploads/photo-1600x900.jpg)";
        let result = MetadataExtractor::new().extract(md, PAGE, ContentFormat::Markdown);
        assert_eq!(result.image, None);
    }

    #[test]
    fn test_title_is_truncated() {
        let long = "a".repeat(400);
        let html = format!("<title>{}</title>", long);
        let title = extract_html(&html).title.unwrap();
        assert_eq!(title.chars().count(), 150);
        assert!(title.ends_with('…'));
        assert_eq!(truncate_title("short", 150), "short");
    }

    #[test]
    fn test_non_utf8_bytes_do_not_fail() {
        let bytes = [0xff, 0xfe, b'<', b't', b'i', b't', b'l', b'e', b'>', b'X', b'<', b'/'];
        let result = MetadataExtractor::new().extract_bytes(&bytes, PAGE, ContentFormat::Html);
        assert!(result.title.is_some());
    }
}

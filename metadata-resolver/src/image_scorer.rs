//! Image Candidate Scorer
//!
//! Ranks candidate image URLs pulled out of a page and picks the one most
//! likely to be the page's representative image. The heuristic is additive:
//! every signal in [`ScoringWeights`] adds or subtracts points, and a
//! candidate has to clear a confidence threshold before it is returned.
//!
//! Selection is deterministic. Equal top scores are resolved in favour of the
//! candidate that appeared first.

use linkshelf_core::canonical::{host_of, resolve_against};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// File extensions accepted as images
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "svg"];

/// CDN hosts of the WordPress family that serve images for self-hosted sites
pub const CDN_HOST_SUFFIXES: &[&str] = &["wp.com", "wordpress.com"];

/// Square sizes that are almost always icons
const ICON_SQUARE_SIZES: &[u32] = &[16, 24, 32, 48, 64, 96, 128, 150, 180, 192, 256];

static SIZE_HINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2,5})[x×](\d{2,5})").unwrap());

static ICON_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[-_./@])(logo|icon|avatar|gravatar|sprite|favicon)s?([-_./@]|$)").unwrap()
});

static ICON_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-_@](16|24|32|48|64|96|128|150|180|192|256)(px)?\.[a-z0-9]+$").unwrap()
});

// name words only count as whole dash/underscore/dot separated tokens
static FEATURED_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[-_.])(main|featured|hero|cover)([-_.]|$)").unwrap());

static BANNER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[-_.])(banner|header)s?([-_.]|$)").unwrap());

/// Tunable weights of the image heuristic
///
/// Positive values are bonuses, negative values penalties. Thresholds are
/// compared against the summed score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    /// Path under a user uploads directory (`/wp-content/uploads/`, `/uploads/`)
    pub uploads_dir: i32,
    /// Path under a theme or plugin asset directory
    pub asset_dir: i32,
    pub ext_jpeg: i32,
    pub ext_webp_avif: i32,
    pub ext_png: i32,
    pub ext_gif_svg: i32,
    /// Filename mentions main/featured/hero/cover
    pub featured_name: i32,
    /// Filename mentions banner/header
    pub banner_name: i32,
    /// Pixel area that earns one bonus point
    pub area_per_point: u32,
    /// Cap on the area bonus
    pub area_bonus_cap: i32,
    /// Width >= 900 or height >= 600
    pub large_size: i32,
    /// Aspect ratio >= 4:1 or <= 1:4
    pub extreme_aspect: i32,
    /// Aspect ratio >= 3:1 or <= 1:3
    pub wide_aspect: i32,
    /// Width < 500 or height < 300
    pub thumbnail: i32,
    /// Width < 800
    pub small_width: i32,
    /// No `WxH` hint in the filename
    pub no_size_hint: i32,
    /// Logo/icon/avatar naming or fixed icon sizes
    pub icon_like: i32,
    /// Favicon services, `.ico` files and `/favicon` paths
    pub favicon: i32,
    /// Candidate was chosen by the publisher in an `og:`/`twitter:` meta tag
    pub meta_tag: i32,
    /// Lowest score accepted at all
    pub min_score: i32,
    /// Lowest score accepted for a winner outside the page's site
    pub min_external_score: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            uploads_dir: 30,
            asset_dir: -25,
            ext_jpeg: 20,
            ext_webp_avif: 15,
            ext_png: 5,
            ext_gif_svg: -5,
            featured_name: 20,
            banner_name: -10,
            area_per_point: 20_000,
            area_bonus_cap: 40,
            large_size: 15,
            extreme_aspect: -40,
            wide_aspect: -15,
            thumbnail: -40,
            small_width: -10,
            no_size_hint: -5,
            icon_like: -60,
            favicon: -1_000,
            meta_tag: 20,
            min_score: 15,
            min_external_score: 30,
        }
    }
}

/// Options for a single selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreOptions {
    /// Accept candidates on any host, at the cost of a stricter threshold
    pub allow_external_hosts: bool,
    /// Candidates come from publisher meta tags and earn the `meta_tag` bonus
    pub from_meta_tags: bool,
}

impl ScoreOptions {
    pub fn same_host_only() -> Self {
        Self::default()
    }

    pub fn external_allowed() -> Self {
        Self {
            allow_external_hosts: true,
            ..Self::default()
        }
    }

    /// Meta tag images: any host, with the publisher bonus
    pub fn meta_tags() -> Self {
        Self {
            allow_external_hosts: true,
            from_meta_tags: true,
        }
    }
}

/// A candidate that survived filtering, with its score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub url: String,
    pub score: i32,
    pub same_site: bool,
}

/// Width and height encoded in a filename such as `photo-1200x800.jpg`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeHint {
    pub width: u32,
    pub height: u32,
}

impl SizeHint {
    /// Parse the last `WxH` pattern found in a filename
    pub fn from_filename(filename: &str) -> Option<Self> {
        let caps = SIZE_HINT_RE.captures_iter(filename).last()?;
        let width = caps.get(1)?.as_str().parse().ok()?;
        let height = caps.get(2)?.as_str().parse().ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }

    fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    fn is_icon_size(&self) -> bool {
        (self.width == self.height && ICON_SQUARE_SIZES.contains(&self.width))
            || (self.width, self.height) == (300, 300)
    }
}

/// Whether a URL points at a favicon or a favicon service
pub fn is_favicon_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    if lower.contains("favicon=") {
        return true;
    }
    let Ok(parsed) = Url::parse(&lower) else {
        return lower.contains("/favicon") || lower.ends_with(".ico");
    };
    let host = parsed.host_str().unwrap_or_default();
    let path = parsed.path();

    path.contains("/favicon")
        || path.ends_with(".ico")
        || (host.ends_with("google.com") && path.starts_with("/s2/favicons"))
        || (host.ends_with("gstatic.com") && path.contains("favicon"))
        || host == "icons.duckduckgo.com"
}

/// Lowercased extension of the URL path, if any
fn path_extension(parsed: &Url) -> Option<String> {
    let last = parsed.path_segments()?.last()?;
    let (_, ext) = last.rsplit_once('.')?;
    Some(ext.to_lowercase())
}

/// Whether a resolved URL is plausibly an image
///
/// `data:image/*` and `blob:` URIs are always accepted; other URLs need an
/// image extension and must not look like a favicon.
pub fn is_likely_image(url: &str) -> bool {
    let lower = url.trim().to_lowercase();
    if lower.starts_with("data:image/") || lower.starts_with("blob:") {
        return true;
    }
    if lower.starts_with("data:") || is_favicon_url(&lower) {
        return false;
    }
    match Url::parse(&lower) {
        Ok(parsed) => path_extension(&parsed)
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false),
        Err(_) => false,
    }
}

fn is_inline(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.starts_with("data:") || lower.starts_with("blob:")
}

/// Whether `candidate_host` belongs to the same site as `page_host`
pub fn is_same_site(page_host: &str, candidate_host: &str) -> bool {
    let page = page_host.trim_start_matches("www.");
    let candidate = candidate_host.trim_start_matches("www.");
    candidate == page
        || candidate.ends_with(&format!(".{}", page))
        || page.ends_with(&format!(".{}", candidate))
}

fn is_allowed_cdn(candidate_host: &str) -> bool {
    CDN_HOST_SUFFIXES
        .iter()
        .any(|suffix| candidate_host == *suffix || candidate_host.ends_with(&format!(".{}", suffix)))
}

/// Image candidate scorer
pub struct ImageScorer {
    weights: ScoringWeights,
}

impl ImageScorer {
    /// Create a scorer with the default weights
    pub fn new() -> Self {
        Self::with_weights(ScoringWeights::default())
    }

    /// Create a scorer with custom weights
    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a single resolved candidate URL
    pub fn score_candidate(&self, url: &str) -> i32 {
        let w = &self.weights;

        if is_favicon_url(url) {
            return w.favicon;
        }

        let lower = url.to_lowercase();
        let parsed = match Url::parse(&lower) {
            Ok(parsed) => parsed,
            // unparsable input carries no path signals
            Err(_) => return w.no_size_hint,
        };
        let path = parsed.path().to_string();
        let filename = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        let mut score = 0;

        if path.contains("/wp-content/uploads/") || path.contains("/uploads/") {
            score += w.uploads_dir;
        }
        if path.contains("/wp-content/themes/")
            || path.contains("/wp-content/plugins/")
            || path.contains("/themes/")
            || path.contains("/plugins/")
            || path.contains("/assets/")
            || path.contains("/static/")
        {
            score += w.asset_dir;
        }

        score += match path_extension(&parsed).as_deref() {
            Some("jpg") | Some("jpeg") => w.ext_jpeg,
            Some("webp") | Some("avif") => w.ext_webp_avif,
            Some("png") => w.ext_png,
            Some("gif") | Some("svg") => w.ext_gif_svg,
            _ => 0,
        };

        if FEATURED_NAME_RE.is_match(&filename) {
            score += w.featured_name;
        }
        if BANNER_NAME_RE.is_match(&filename) {
            score += w.banner_name;
        }

        match SizeHint::from_filename(&filename) {
            Some(size) => {
                score += self.size_score(size);
                if size.is_icon_size() {
                    score += w.icon_like;
                }
            }
            None => score += w.no_size_hint,
        }

        if ICON_NAME_RE.is_match(&path) || ICON_SUFFIX_RE.is_match(&filename) {
            score += w.icon_like;
        }

        score
    }

    fn size_score(&self, size: SizeHint) -> i32 {
        let w = &self.weights;
        let mut score = 0;

        let area = u64::from(size.width) * u64::from(size.height);
        let per_point = u64::from(w.area_per_point.max(1));
        score += (area / per_point).min(w.area_bonus_cap.max(0) as u64) as i32;

        if size.width >= 900 || size.height >= 600 {
            score += w.large_size;
        }

        let aspect = size.aspect();
        if aspect >= 4.0 || aspect <= 0.25 {
            score += w.extreme_aspect;
        } else if aspect >= 3.0 || aspect <= 1.0 / 3.0 {
            score += w.wide_aspect;
        }

        if size.width < 500 || size.height < 300 {
            score += w.thumbnail;
        } else if size.width < 800 {
            score += w.small_width;
        }

        score
    }

    /// Resolve, deduplicate, filter and score candidates in input order
    pub fn rank_candidates<S: AsRef<str>>(
        &self,
        page_url: &str,
        candidates: &[S],
        options: ScoreOptions,
    ) -> Vec<ScoredCandidate> {
        let page_host = host_of(page_url).unwrap_or_default();
        let mut seen = HashSet::new();
        let mut ranked = Vec::new();

        for candidate in candidates {
            let Some(resolved) = resolve_against(page_url, candidate.as_ref()) else {
                continue;
            };
            if !seen.insert(resolved.clone()) || !is_likely_image(&resolved) {
                continue;
            }

            let same_site = if is_inline(&resolved) {
                true
            } else {
                match host_of(&resolved) {
                    Some(host) => {
                        (!page_host.is_empty() && is_same_site(&page_host, &host))
                            || is_allowed_cdn(&host)
                    }
                    None => false,
                }
            };
            if !same_site && !options.allow_external_hosts {
                continue;
            }

            let mut score = self.score_candidate(&resolved);
            if options.from_meta_tags {
                score += self.weights.meta_tag;
            }
            ranked.push(ScoredCandidate {
                url: resolved,
                score,
                same_site,
            });
        }

        ranked
    }

    /// Pick the best image among `candidates` for the page at `page_url`
    ///
    /// Returns `None` when nothing clears the confidence threshold so the
    /// caller can fall back to a placeholder.
    pub fn pick_best<S: AsRef<str>>(
        &self,
        page_url: &str,
        candidates: &[S],
        options: ScoreOptions,
    ) -> Option<String> {
        let ranked = self.rank_candidates(page_url, candidates, options);

        let mut best: Option<&ScoredCandidate> = None;
        for candidate in &ranked {
            match best {
                Some(current) if candidate.score <= current.score => {}
                _ => best = Some(candidate),
            }
        }
        let best = best?;

        if best.score < self.weights.min_score {
            tracing::debug!(url = %best.url, score = best.score, "best image below threshold");
            return None;
        }
        if options.allow_external_hosts
            && !best.same_site
            && best.score < self.weights.min_external_score
        {
            tracing::debug!(url = %best.url, score = best.score, "external image below threshold");
            return None;
        }

        Some(best.url.clone())
    }
}

impl Default for ImageScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the best candidate with the default weights
pub fn pick_best<S: AsRef<str>>(
    page_url: &str,
    candidates: &[S],
    options: ScoreOptions,
) -> Option<String> {
    ImageScorer::new().pick_best(page_url, candidates, options)
}

//! URL canonicalization for bookmark deduplication
//!
//! Turns raw user input into a normalized, comparable URL and derives the
//! dedup key used to decide whether two bookmarks point at the same resource.
//! Every function here is total: malformed input falls back to a defined
//! value instead of failing.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use url::Url;

use crate::errors::ValidationError;

/// Scheme prepended to input that does not carry one
pub const DEFAULT_SCHEME: &str = "https";

/// Query parameters that only carry tracking information
pub const TRACKING_PARAMS: &[&str] = &["gclid", "fbclid", "igshid", "mc_cid", "mc_eid"];

/// Prefix shared by all UTM tracking parameters
const UTM_PREFIX: &str = "utm_";

static SCHEME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://").unwrap());

static WELL_FORMED_HTTP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)https?://[^/\\]").unwrap());

// Matches mangled protocol prefixes such as `http//`, `https:///`, `htp:/` or `https:\\`
static PROTOCOL_TYPO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)h+t+p+s?(?:[:;]+[/\\]*|[/\\]+)").unwrap());

/// Whether the input already starts with `scheme://`
pub fn has_scheme(input: &str) -> bool {
    SCHEME_PREFIX.is_match(input)
}

fn with_default_scheme(input: &str) -> Cow<'_, str> {
    if has_scheme(input) {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{}://{}", DEFAULT_SCHEME, input))
    }
}

/// Normalize raw input into a fully-qualified URL string
///
/// Input without a scheme gets `https://`. When the result still cannot be
/// parsed the prefixed string is returned unchanged.
pub fn canonicalize(raw: &str) -> String {
    let prefixed = with_default_scheme(raw.trim());
    match Url::parse(&prefixed) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => prefixed.into_owned(),
    }
}

/// Whether a query parameter name only exists for tracking
pub fn is_tracking_param(name: &str) -> bool {
    let name = name.to_lowercase();
    name.starts_with(UTM_PREFIX) || TRACKING_PARAMS.contains(&name.as_str())
}

/// Derive the dedup key for a URL
///
/// The key is `host + path + query` with the fragment dropped, tracking
/// parameters removed, trailing slashes collapsed and the remaining
/// parameters sorted. Unparsable input yields the trimmed, lowercased raw
/// string so two identical broken inputs still collide.
pub fn dedup_key(url: &str) -> String {
    let trimmed = url.trim();
    let prefixed = with_default_scheme(trimmed);

    let mut parsed = match Url::parse(&prefixed) {
        Ok(parsed) => parsed,
        Err(_) => return trimmed.to_lowercase(),
    };
    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return trimmed.to_lowercase(),
    };

    parsed.set_fragment(None);

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    params.sort();

    let path = parsed.path().trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };

    let mut key = host;
    if let Some(port) = parsed.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(path);

    if !params.is_empty() {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        key.push('?');
        key.push_str(&query);
    }

    key
}

/// Rewrite mangled `http` prefixes into a single `https://`
pub fn correct_protocol_typos(input: &str) -> Cow<'_, str> {
    if WELL_FORMED_HTTP.is_match(input) {
        return Cow::Borrowed(input);
    }
    match PROTOCOL_TYPO.find(input) {
        Some(m) => Cow::Owned(format!("{}://{}", DEFAULT_SCHEME, &input[m.end()..])),
        None => Cow::Borrowed(input),
    }
}

/// Validate user input for the add-bookmark path
///
/// Returns the normalized URL (`example.com` becomes `https://example.com/`).
pub fn validate(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let corrected = correct_protocol_typos(trimmed);
    if let Cow::Owned(fixed) = &corrected {
        tracing::debug!(input = trimmed, corrected = %fixed, "corrected protocol typo");
    }

    if corrected.chars().any(char::is_whitespace) {
        return Err(ValidationError::ContainsWhitespace {
            input: trimmed.to_string(),
        });
    }

    let without_scheme = match SCHEME_PREFIX.find(&corrected) {
        Some(m) => &corrected[m.end()..],
        None => corrected.as_ref(),
    };
    if !without_scheme.contains('.') {
        return Err(ValidationError::MissingDot {
            input: trimmed.to_string(),
        });
    }

    let prefixed = with_default_scheme(&corrected);
    let parsed = Url::parse(&prefixed).map_err(|_| ValidationError::Unparsable {
        input: trimmed.to_string(),
    })?;

    let host = parsed.host_str().unwrap_or_default();
    if host.len() < 3 || !host.contains('.') {
        return Err(ValidationError::InvalidHost {
            host: host.to_string(),
        });
    }

    Ok(parsed.to_string())
}

/// Lowercased host of a URL, if it has one
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .filter(|h| !h.is_empty())
}

/// Display label for a URL: the second-level host label, uppercased
///
/// `https://www.blog.example.com/x` gives `EXAMPLE`. Unparsable input gives
/// an empty label.
pub fn domain_label(url: &str) -> String {
    let host = match host_of(&with_default_scheme(url.trim())) {
        Some(host) => host,
        None => return String::new(),
    };
    let labels: Vec<&str> = host
        .trim_start_matches("www.")
        .split('.')
        .filter(|l| !l.is_empty())
        .collect();
    let label = match labels.len() {
        0 => "",
        1 => labels[0],
        n => labels[n - 2],
    };
    label.to_uppercase()
}

/// Resolve a possibly relative reference against a base URL
///
/// Handles protocol-relative (`//cdn/x.png`), root-relative (`/x.png`),
/// relative (`img/x.png`) and absolute references. `data:` and `blob:` URIs
/// pass through untouched. References with other non-HTTP schemes
/// (`javascript:`, `mailto:`) resolve to `None`.
pub fn resolve_against(base: &str, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    let lower = reference.to_lowercase();
    if lower.starts_with("data:") || lower.starts_with("blob:") {
        return Some(reference.to_string());
    }

    if let Ok(absolute) = Url::parse(reference) {
        return match absolute.scheme() {
            "http" | "https" if absolute.host_str().is_some() => Some(absolute.to_string()),
            _ => None,
        };
    }

    match Url::parse(&canonicalize(base)) {
        Ok(base) => base
            .join(reference)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .map(|u| u.to_string()),
        Err(_) if reference.starts_with("//") => {
            Url::parse(&format!("{}:{}", DEFAULT_SCHEME, reference))
                .ok()
                .map(|u| u.to_string())
        }
        Err(_) => None,
    }
}

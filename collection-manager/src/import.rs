//! Bookmark Import/Export
//!
//! Normalizes loosely-shaped JSON coming from exports, older snapshots or
//! other tools into well-formed [`BookmarkRecord`]s. Import never fails as a
//! whole: elements that cannot be turned into a record are dropped and
//! counted.

use chrono::{DateTime, TimeZone, Utc};
use linkshelf_core::canonical::{canonicalize, domain_label, host_of};
use linkshelf_core::{BookmarkId, BookmarkRecord, CheckStatus, Priority, MAX_RATING};
use serde_json::{Map, Value};

/// Outcome of importing a batch of raw records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub records: Vec<BookmarkRecord>,
    /// Elements that were not objects or had no usable `url`
    pub dropped: usize,
}

/// Split a free-form tag string on commas and whitespace
///
/// Tags are trimmed and lowercased; blanks and repeats are dropped while the
/// order of first appearance is kept.
pub fn parse_tags(raw: &str) -> Vec<String> {
    collect_tags(raw.split(|c: char| c == ',' || c.is_whitespace()))
}

fn collect_tags<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for token in tokens {
        let tag = token.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn tags_from(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(raw)) => parse_tags(raw),
        Some(Value::Array(items)) => collect_tags(items.iter().filter_map(Value::as_str)),
        _ => Vec::new(),
    }
}

/// Parse an RFC 3339 string or an epoch-milliseconds number
fn timestamp_from(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        _ => None,
    }
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn non_negative_u64(value: Option<&Value>) -> Option<u64> {
    let n = match value? {
        Value::Number(n) => n,
        _ => return None,
    };
    n.as_u64()
        .or_else(|| n.as_i64().map(|i| i.max(0) as u64))
        .or_else(|| n.as_f64().map(|f| f.max(0.0) as u64))
}

/// Turn one raw JSON value into a record, `None` when it has no usable URL
pub fn normalize_record(raw: &Value) -> Option<BookmarkRecord> {
    let obj = raw.as_object()?;
    let url = canonicalize(non_empty_str(obj, "url")?);

    let title = non_empty_str(obj, "title")
        .map(str::to_string)
        .or_else(|| host_of(&url))
        .unwrap_or_else(|| url.clone());

    let mut record = BookmarkRecord::new(url, title);

    if let Some(id) = non_empty_str(obj, "id").and_then(BookmarkId::parse) {
        record.id = id;
    }
    record.image = non_empty_str(obj, "image").map(str::to_string);
    record.domain = domain_label(&record.url);
    record.tags = tags_from(obj.get("tags"));
    if let Some(timestamp) = timestamp_from(obj.get("timestamp")) {
        record.timestamp = timestamp;
    }

    record.favorite = obj.get("favorite").and_then(Value::as_bool).unwrap_or(false);
    record.archived = obj.get("archived").and_then(Value::as_bool).unwrap_or(false);
    record.notes = obj
        .get("notes")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let rating = non_negative_u64(obj.get("rating")).unwrap_or(0);
    record.set_rating(rating.min(MAX_RATING as u64) as u8);
    record.priority = non_empty_str(obj, "priority")
        .and_then(Priority::parse)
        .unwrap_or_default();

    record.open_count = non_negative_u64(obj.get("openCount"))
        .map(|n| n.min(u32::MAX as u64) as u32)
        .unwrap_or(0);
    record.last_opened_at = timestamp_from(obj.get("lastOpenedAt"));
    record.check_status = non_empty_str(obj, "checkStatus")
        .and_then(CheckStatus::parse)
        .unwrap_or_default();
    record.last_checked_at = timestamp_from(obj.get("lastCheckedAt"));

    Some(record)
}

/// Normalize a batch given as an array or as `{ "bookmarks": [...] }`
pub fn import_batch(raw: &Value) -> ImportReport {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("bookmarks") {
            Some(Value::Array(items)) => items,
            _ => {
                tracing::warn!("import object has no bookmarks array");
                return ImportReport::default();
            }
        },
        _ => {
            tracing::warn!("import payload is neither an array nor an object");
            return ImportReport::default();
        }
    };

    let mut report = ImportReport::default();
    for item in items {
        match normalize_record(item) {
            Some(record) => report.records.push(record),
            None => report.dropped += 1,
        }
    }

    tracing::debug!(
        imported = report.records.len(),
        dropped = report.dropped,
        "normalized import batch"
    );
    report
}

/// Serialize records as a JSON array in collection order
pub fn export_batch(records: &[BookmarkRecord]) -> Value {
    Value::Array(
        records
            .iter()
            .filter_map(|record| serde_json::to_value(record).ok())
            .collect(),
    )
}

//! Duplicate Merge Engine
//!
//! Collapses records that share a dedup key into a single record carrying
//! the combined user data of the group.
//!
//! Groups keep the order in which their first member appears in the input.
//! Inside a group records are folded newest first, so the newest record
//! supplies the identity fields (`id`, `url`, `domain`, `timestamp`).

use linkshelf_core::{BookmarkId, BookmarkRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Separator placed between notes of merged records
pub const NOTES_SEPARATOR: &str = "\n\n---\n\n";

/// Result of a merge pass
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub merged: Vec<BookmarkRecord>,
    /// Number of input records folded into another record
    pub removed_count: usize,
}

/// A set of records sharing one dedup key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub dedup_key: String,
    pub ids: Vec<BookmarkId>,
}

/// Partition records by dedup key, keeping first-appearance order
fn group_by_key(records: &[BookmarkRecord]) -> Vec<(String, Vec<&BookmarkRecord>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&BookmarkRecord>)> = Vec::new();

    for record in records {
        let key = record.dedup_key();
        match index.get(&key) {
            Some(&slot) => groups[slot].1.push(record),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![record]));
            }
        }
    }

    groups
}

/// Merge every group of duplicates into one record
pub fn merge_duplicates(records: &[BookmarkRecord]) -> MergeOutcome {
    let groups = group_by_key(records);
    let removed_count = records.len() - groups.len();

    let merged = groups
        .into_iter()
        .filter_map(|(_, mut members)| {
            // stable: equal timestamps keep input order
            members.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            let (newest, rest) = members.split_first()?;
            Some(rest.iter().fold((*newest).clone(), |acc, next| merge_pair(&acc, next)))
        })
        .collect();

    if removed_count > 0 {
        tracing::info!(removed_count, "merged duplicate bookmarks");
    }

    MergeOutcome {
        merged,
        removed_count,
    }
}

/// Groups with more than one member, in first-appearance order
pub fn find_duplicate_groups(records: &[BookmarkRecord]) -> Vec<DuplicateGroup> {
    group_by_key(records)
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(dedup_key, members)| DuplicateGroup {
            dedup_key,
            ids: members.iter().map(|r| r.id.clone()).collect(),
        })
        .collect()
}

/// Combine two records describing the same resource; `a` takes precedence
pub fn merge_pair(a: &BookmarkRecord, b: &BookmarkRecord) -> BookmarkRecord {
    let mut merged = a.clone();

    for tag in &b.tags {
        if !merged.tags.contains(tag) {
            merged.tags.push(tag.clone());
        }
    }

    merged.notes = merge_notes(&a.notes, &b.notes);

    merged.open_count = a.open_count.saturating_add(b.open_count);
    merged.last_opened_at = a.last_opened_at.max(b.last_opened_at);

    if b.check_status.rank() > a.check_status.rank() {
        merged.check_status = b.check_status;
    }
    merged.last_checked_at = a.last_checked_at.max(b.last_checked_at);

    merged.rating = a.rating.max(b.rating);
    if b.priority.rank() > a.priority.rank() {
        merged.priority = b.priority;
    }

    if b.title.trim().chars().count() > a.title.trim().chars().count() {
        merged.title = b.title.clone();
    }
    if merged.image.is_none() {
        merged.image = b.image.clone();
    }

    merged.favorite = a.favorite || b.favorite;
    merged.archived = a.archived && b.archived;

    merged
}

fn merge_notes(a: &str, b: &str) -> String {
    match (a.trim().is_empty(), b.trim().is_empty()) {
        (false, false) if a != b => format!("{}{}{}", a, NOTES_SEPARATOR, b),
        (false, _) => a.to_string(),
        (true, false) => b.to_string(),
        (true, true) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use linkshelf_core::{CheckStatus, Priority};

    fn record(url: &str, age_days: i64) -> BookmarkRecord {
        let mut r = BookmarkRecord::new(url, "Title");
        r.timestamp = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap() - Duration::days(age_days);
        r
    }

    #[test]
    fn test_merge_combines_user_data() {
        let mut old = record("https://example.com/a", 10);
        old.tags = vec!["rust".into(), "lang".into()];
        old.notes = "first".into();
        old.open_count = 3;
        old.rating = 4;
        old.favorite = true;
        old.archived = true;
        old.check_status = CheckStatus::Broken;
        old.image = Some("https://example.com/old.jpg".into());
        old.title = "A much longer title".into();

        let mut new = record("example.com/a/", 1);
        new.tags = vec!["web".into(), "rust".into()];
        new.notes = "second".into();
        new.open_count = 2;
        new.rating = 2;
        new.priority = Priority::High;
        new.check_status = CheckStatus::Ok;

        let outcome = merge_duplicates(&[old.clone(), new.clone()]);
        assert_eq!(outcome.removed_count, 1);
        assert_eq!(outcome.merged.len(), 1);

        let m = &outcome.merged[0];
        assert_eq!(m.id, new.id);
        assert_eq!(m.url, new.url);
        assert_eq!(m.timestamp, new.timestamp);
        assert_eq!(m.tags, vec!["web", "rust", "lang"]);
        assert_eq!(m.notes, "second\n\n---\n\nfirst");
        assert_eq!(m.open_count, 5);
        assert_eq!(m.rating, 4);
        assert_eq!(m.priority, Priority::High);
        assert_eq!(m.check_status, CheckStatus::Broken);
        assert_eq!(m.title, "A much longer title");
        assert_eq!(m.image.as_deref(), Some("https://example.com/old.jpg"));
        assert!(m.favorite);
        assert!(!m.archived);
    }

    #[test]
    fn test_identical_notes_are_not_repeated() {
        let mut a = record("https://example.com/a", 0);
        a.notes = "same".into();
        let mut b = record("https://example.com/a", 1);
        b.notes = "same".into();
        assert_eq!(merge_pair(&a, &b).notes, "same");

        a.notes = "  ".into();
        b.notes = "only b".into();
        assert_eq!(merge_pair(&a, &b).notes, "only b");
    }

    #[test]
    fn test_group_order_follows_first_appearance() {
        let records = vec![
            record("https://b.com/", 0),
            record("https://a.com/", 0),
            record("https://b.com/?utm_source=x", 5),
            record("https://c.com/", 0),
        ];
        let outcome = merge_duplicates(&records);
        let urls: Vec<&str> = outcome.merged.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://b.com/", "https://a.com/", "https://c.com/"]);
        assert_eq!(outcome.removed_count, 1);
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let a = record("https://example.com/x", 0);
        let b = record("https://example.com/x#frag", 0);
        let outcome = merge_duplicates(&[a.clone(), b]);
        assert_eq!(outcome.merged[0].id, a.id);
    }

    #[test]
    fn test_open_count_saturates() {
        let mut a = record("https://example.com/", 0);
        a.open_count = u32::MAX;
        let mut b = record("https://example.com/", 1);
        b.open_count = 10;
        assert_eq!(merge_pair(&a, &b).open_count, u32::MAX);
    }

    #[test]
    fn test_no_duplicates_is_identity() {
        let records = vec![record("https://a.com/", 0), record("https://b.com/", 0)];
        let outcome = merge_duplicates(&records);
        assert_eq!(outcome.merged, records);
        assert_eq!(outcome.removed_count, 0);
        assert!(find_duplicate_groups(&records).is_empty());
    }

    #[test]
    fn test_find_duplicate_groups() {
        let a = record("https://example.com/a", 0);
        let b = record("https://other.com/", 0);
        let c = record("example.com/a/", 3);
        let groups = find_duplicate_groups(&[a.clone(), b, c.clone()]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].dedup_key, "example.com/a");
        assert_eq!(groups[0].ids, vec![a.id, c.id]);
    }

    #[test]
    fn test_empty_input() {
        let outcome = merge_duplicates(&[]);
        assert!(outcome.merged.is_empty());
        assert_eq!(outcome.removed_count, 0);
    }
}

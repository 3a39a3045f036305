//! JSON snapshot codec
//!
//! A snapshot is a flat, ordered JSON array of records. Loading goes through
//! the import normalizer so snapshots written by older versions, or edited
//! by hand, still load with defaults filled in.

use linkshelf_core::{BookmarkRecord, Result, SystemError};
use std::path::Path;

use crate::import::{import_batch, ImportReport};

/// Decode snapshot text; only unreadable JSON is an error
pub fn load_snapshot(json: &str) -> Result<ImportReport> {
    if json.trim().is_empty() {
        return Ok(ImportReport::default());
    }
    let value: serde_json::Value = serde_json::from_str(json).map_err(SystemError::from)?;
    let report = import_batch(&value);
    if report.dropped > 0 {
        tracing::warn!(dropped = report.dropped, "snapshot contained malformed records");
    }
    Ok(report)
}

/// Encode records as snapshot text
pub fn save_snapshot(records: &[BookmarkRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records).map_err(SystemError::from)?)
}

/// Read a snapshot file; a missing file is an empty collection
pub async fn read_snapshot_file(path: &Path) -> Result<ImportReport> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => load_snapshot(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no snapshot file yet");
            Ok(ImportReport::default())
        }
        Err(e) => Err(SystemError::from(e).into()),
    }
}

/// Write a snapshot file, creating parent directories as needed
pub async fn write_snapshot_file(path: &Path, records: &[BookmarkRecord]) -> Result<()> {
    let text = save_snapshot(records)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(SystemError::from)?;
    }
    tokio::fs::write(path, text).await.map_err(SystemError::from)?;
    tracing::debug!(path = %path.display(), count = records.len(), "snapshot written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkshelf_core::{CheckStatus, LinkshelfError, Priority};

    #[test]
    fn test_load_fills_defaults() {
        let report = load_snapshot(r#"[{"id":"6f1c2b9e-4a8d-4c2f-9a51-0e7f3b2d1c44","url":"https://example.com/","title":"Example"}]"#)
            .unwrap();
        assert_eq!(report.dropped, 0);
        let record = &report.records[0];
        assert!(!record.favorite);
        assert!(!record.archived);
        assert_eq!(record.rating, 0);
        assert_eq!(record.priority, Priority::Medium);
        assert_eq!(record.check_status, CheckStatus::Unknown);
        assert_eq!(record.open_count, 0);
        assert!(record.notes.is_empty());
    }

    #[test]
    fn test_load_drops_malformed_records() {
        let report = load_snapshot(r#"[{"url":"https://a.com/"}, {"title":"x"}, 3]"#).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.dropped, 2);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let err = load_snapshot("[{").unwrap_err();
        assert!(matches!(err, LinkshelfError::System { .. }));
        assert!(load_snapshot("  ").unwrap().records.is_empty());
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let records = vec![
            BookmarkRecord::new("https://b.com/", "B"),
            BookmarkRecord::new("https://a.com/", "A"),
        ];
        let text = save_snapshot(&records).unwrap();
        let loaded = load_snapshot(&text).unwrap();
        assert_eq!(loaded.records, records);
    }
}

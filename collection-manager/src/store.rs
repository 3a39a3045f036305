//! In-memory bookmark store
//!
//! Owns the ordered bookmark collection behind an async `RwLock`. All
//! mutation of the collection goes through this type; the pure functions in
//! `linkshelf_core` and [`crate::merge`] never hold state of their own.

use chrono::Utc;
use linkshelf_core::canonical::{dedup_key, validate};
use linkshelf_core::{
    BookmarkId, BookmarkRecord, CheckStatus, CollectionError, MetadataResult, Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::merge::{find_duplicate_groups, merge_duplicates, DuplicateGroup};

/// Counts reported after importing a batch into the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records appended to the collection
    pub imported: usize,
    /// Records folded into an existing record afterwards
    pub merged: usize,
    /// Collection size after the import
    pub total: usize,
}

/// Shared, ordered bookmark collection
#[derive(Clone, Default)]
pub struct BookmarkStore {
    records: Arc<RwLock<Vec<BookmarkRecord>>>,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `records` in the given order
    pub fn from_records(records: Vec<BookmarkRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Copy of the whole collection in order
    pub async fn snapshot(&self) -> Vec<BookmarkRecord> {
        self.records.read().await.clone()
    }

    pub async fn get(&self, id: &BookmarkId) -> Option<BookmarkRecord> {
        self.records.read().await.iter().find(|r| &r.id == id).cloned()
    }

    /// Existing record describing the same resource as `url`
    pub async fn find_by_url(&self, url: &str) -> Option<BookmarkRecord> {
        let key = dedup_key(url);
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.dedup_key() == key)
            .cloned()
    }

    /// Validate raw user input and make sure it is not already saved
    ///
    /// Returns the normalized URL to resolve metadata for.
    pub async fn prepare_add(&self, raw_url: &str) -> Result<String> {
        let url = validate(raw_url).map_err(CollectionError::from)?;
        if let Some(existing) = self.find_by_url(&url).await {
            return Err(CollectionError::Duplicate {
                existing_id: existing.id,
                dedup_key: dedup_key(&url),
            }
            .into());
        }
        Ok(url)
    }

    /// Validate, build and insert a record for `raw_url` with resolved metadata
    pub async fn add(
        &self,
        raw_url: &str,
        tags: &[String],
        metadata: &MetadataResult,
    ) -> Result<BookmarkRecord> {
        let url = self.prepare_add(raw_url).await?;
        let mut record = BookmarkRecord::new(url, "");
        metadata.apply_to(&mut record);
        for tag in tags {
            record.add_tag(tag);
        }
        record.id = self.insert(record.clone()).await?;
        Ok(record)
    }

    /// Insert a prepared record, rejecting it when its dedup key is taken
    ///
    /// New records go to the front of the collection. A record whose id is
    /// already in use gets a fresh one; the returned id is the stored one.
    pub async fn insert(&self, mut record: BookmarkRecord) -> Result<BookmarkId> {
        let key = record.dedup_key();
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter().find(|r| r.dedup_key() == key) {
            return Err(CollectionError::Duplicate {
                existing_id: existing.id.clone(),
                dedup_key: key,
            }
            .into());
        }
        if records.iter().any(|r| r.id == record.id) {
            record.id = BookmarkId::new();
        }
        let id = record.id.clone();
        tracing::info!(%id, url = %record.url, "bookmark added");
        records.insert(0, record);
        Ok(id)
    }

    pub async fn remove(&self, id: &BookmarkId) -> Result<BookmarkRecord> {
        let mut records = self.records.write().await;
        let index = records
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| CollectionError::NotFound { id: id.clone() })?;
        Ok(records.remove(index))
    }

    /// Apply `change` to the record with `id` and return the updated copy
    pub async fn update<F>(&self, id: &BookmarkId, change: F) -> Result<BookmarkRecord>
    where
        F: FnOnce(&mut BookmarkRecord),
    {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| CollectionError::NotFound { id: id.clone() })?;
        change(record);
        Ok(record.clone())
    }

    /// Count an open of the bookmark
    pub async fn record_open(&self, id: &BookmarkId) -> Result<BookmarkRecord> {
        self.update(id, |r| r.mark_opened(Utc::now())).await
    }

    /// Store the outcome of a link health check
    pub async fn record_check(&self, id: &BookmarkId, status: CheckStatus) -> Result<BookmarkRecord> {
        self.update(id, |r| r.mark_checked(status, Utc::now())).await
    }

    /// Groups of records currently sharing a dedup key
    pub async fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        find_duplicate_groups(&self.records.read().await)
    }

    /// Merge duplicates and swap the collection in one step
    ///
    /// Returns the number of records removed.
    pub async fn merge_in_place(&self) -> usize {
        let mut records = self.records.write().await;
        let outcome = merge_duplicates(&records);
        *records = outcome.merged;
        outcome.removed_count
    }

    /// Append imported records, then merge any duplicates they introduced
    ///
    /// An imported id already held by a record with a different dedup key is
    /// replaced with a fresh one, so ids stay unique after the merge.
    pub async fn import(&self, mut imported: Vec<BookmarkRecord>) -> ImportSummary {
        let mut records = self.records.write().await;
        let count = imported.len();

        let mut taken: HashMap<BookmarkId, String> = records
            .iter()
            .map(|r| (r.id.clone(), r.dedup_key()))
            .collect();
        for record in imported.iter_mut() {
            let key = record.dedup_key();
            match taken.get(&record.id) {
                Some(owner) if *owner != key => {
                    let fresh = BookmarkId::new();
                    tracing::debug!(old = %record.id, new = %fresh, "imported id already in use");
                    record.id = fresh;
                }
                _ => {}
            }
            taken.entry(record.id.clone()).or_insert(key);
        }

        records.extend(imported);
        let outcome = merge_duplicates(&records);
        *records = outcome.merged;

        let summary = ImportSummary {
            imported: count,
            merged: outcome.removed_count,
            total: records.len(),
        };
        tracing::info!(?summary, "import applied");
        summary
    }

    /// Replace the whole collection
    pub async fn replace_all(&self, records: Vec<BookmarkRecord>) {
        *self.records.write().await = records;
    }
}

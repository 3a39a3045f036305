//! Collection Manager for Linkshelf
//!
//! Owns everything that operates on a whole bookmark collection rather than
//! a single URL.
//!
//! # Features
//! - Duplicate detection and merging by dedup key
//! - Import normalization of loosely-shaped JSON and export
//! - JSON snapshot persistence
//! - Explicit in-memory store with add, open and link-check tracking

pub mod merge;
pub mod import;
pub mod snapshot;
pub mod store;

pub use merge::{find_duplicate_groups, merge_duplicates, merge_pair, DuplicateGroup, MergeOutcome};
pub use import::{export_batch, import_batch, normalize_record, parse_tags, ImportReport};
pub use snapshot::{load_snapshot, read_snapshot_file, save_snapshot, write_snapshot_file};
pub use store::{BookmarkStore, ImportSummary};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canonical;

/// Placeholder title used whenever no usable title can be resolved
pub const PLACEHOLDER_TITLE: &str = "Untitled";

/// Highest rating a bookmark can carry
pub const MAX_RATING: u8 = 5;

/// Unique identifier for a bookmark record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(pub Uuid);

impl BookmarkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its string form
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl Default for BookmarkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Reading priority of a bookmark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Ordering used when merging duplicates: high > medium > low
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }

    /// Case-insensitive parse, `None` for unknown values
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Result of the last link health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    #[default]
    Unknown,
    Ok,
    Broken,
}

impl CheckStatus {
    /// Ordering used when merging duplicates: broken > ok > unknown
    pub fn rank(self) -> u8 {
        match self {
            CheckStatus::Unknown => 0,
            CheckStatus::Ok => 1,
            CheckStatus::Broken => 2,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "unknown" => Some(CheckStatus::Unknown),
            "ok" => Some(CheckStatus::Ok),
            "broken" => Some(CheckStatus::Broken),
            _ => None,
        }
    }
}

/// One saved resource in a bookmark collection
///
/// Two records describe the same resource when their [`BookmarkRecord::dedup_key`]
/// values are equal, regardless of `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    pub id: BookmarkId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub open_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_opened_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub check_status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl BookmarkRecord {
    /// Create a fresh record for `url` with every collection field at its default
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        let url = url.into();
        let domain = canonical::domain_label(&url);
        Self {
            id: BookmarkId::new(),
            url,
            title: title.into(),
            image: None,
            domain,
            tags: Vec::new(),
            timestamp: Utc::now(),
            favorite: false,
            archived: false,
            notes: String::new(),
            rating: 0,
            priority: Priority::default(),
            open_count: 0,
            last_opened_at: None,
            check_status: CheckStatus::default(),
            last_checked_at: None,
        }
    }

    /// Canonical key used for duplicate detection
    pub fn dedup_key(&self) -> String {
        canonical::dedup_key(&self.url)
    }

    /// Add a tag, lowercasing it and ignoring blanks and repeats
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Set the rating, clamped to 0..=5
    pub fn set_rating(&mut self, rating: u8) {
        self.rating = rating.min(MAX_RATING);
    }

    /// Record that the bookmark was opened at `at`
    pub fn mark_opened(&mut self, at: DateTime<Utc>) {
        self.open_count = self.open_count.saturating_add(1);
        self.last_opened_at = Some(at);
    }

    /// Record the outcome of a link health check
    pub fn mark_checked(&mut self, status: CheckStatus, at: DateTime<Utc>) {
        self.check_status = status;
        self.last_checked_at = Some(at);
    }

    /// Replace the URL and recompute the derived domain label
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
        self.domain = canonical::domain_label(&self.url);
    }

    /// Image to display, falling back to the caller's placeholder
    pub fn display_image<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.image.as_deref().unwrap_or(placeholder)
    }
}

/// Which content path produced a metadata result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    Html,
    Markdown,
    Placeholder,
}

/// Title and image resolved for a URL by a single resolution attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataResult {
    pub title: Option<String>,
    pub image: Option<String>,
    pub url: String,
    pub source: MetadataSource,
}

impl MetadataResult {
    /// Result used when nothing could be fetched or parsed
    pub fn placeholder(url: impl Into<String>) -> Self {
        Self {
            title: Some(PLACEHOLDER_TITLE.to_string()),
            image: None,
            url: url.into(),
            source: MetadataSource::Placeholder,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == MetadataSource::Placeholder
    }

    /// Title to store on a record, never empty
    pub fn title_or_placeholder(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => PLACEHOLDER_TITLE,
        }
    }

    /// Copy the resolved fields onto a bookmark record
    pub fn apply_to(&self, record: &mut BookmarkRecord) {
        record.title = self.title_or_placeholder().to_string();
        if self.image.is_some() {
            record.image = self.image.clone();
        }
    }
}

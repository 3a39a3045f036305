//! Metadata Resolver for Linkshelf
//!
//! Resolves a representative title and image for a bookmarked URL from
//! unreliable content fetched through best-effort proxies.
//!
//! # Features
//! - Image candidate scoring with tunable weights
//! - Title/image extraction from HTML and proxy Markdown
//! - Fetch-with-fallback pipeline bounded by per-attempt timeouts
//! - Superseding resolution slot for rapid successive requests

pub mod image_scorer;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;
pub mod slot;

pub use image_scorer::{pick_best, ImageScorer, ScoreOptions, ScoredCandidate, ScoringWeights};
pub use extractor::{ContentFormat, ExtractorConfig, MetadataExtractor};
pub use fetcher::{ContentFetcher, FetchResponse, ReqwestFetcher, ReqwestFetcherConfig};
pub use pipeline::{MetadataPipeline, PipelineConfig, ProxyEndpoints};
pub use slot::{ResolutionHandle, ResolutionSlot};

// Re-export commonly used types
pub use linkshelf_core::{MetadataResult, MetadataSource};

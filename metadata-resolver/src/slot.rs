//! Superseding resolution slot
//!
//! A caller that resolves metadata while the user is still typing a URL
//! should only ever wait on the latest request. [`ResolutionSlot`] holds at
//! most one in-flight resolution; submitting a new URL aborts the previous
//! task instead of queueing behind it.

use linkshelf_core::MetadataResult;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

use crate::pipeline::MetadataPipeline;

/// Handle to a submitted resolution
pub struct ResolutionHandle {
    url: String,
    task: JoinHandle<MetadataResult>,
}

impl ResolutionHandle {
    /// URL this handle resolves
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the result; `None` when a later submission superseded it
    pub async fn wait(self) -> Option<MetadataResult> {
        match self.task.await {
            Ok(result) => Some(result),
            Err(e) if e.is_cancelled() => {
                tracing::debug!(url = %self.url, "resolution superseded");
                None
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "resolution task failed");
                Some(MetadataResult::placeholder(self.url))
            }
        }
    }
}

/// Single caller slot for metadata resolution
pub struct ResolutionSlot {
    pipeline: Arc<MetadataPipeline>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl ResolutionSlot {
    pub fn new(pipeline: Arc<MetadataPipeline>) -> Self {
        Self {
            pipeline,
            in_flight: Mutex::new(None),
        }
    }

    /// Start resolving `url`, aborting whatever this slot was resolving before
    pub async fn submit(&self, url: &str) -> ResolutionHandle {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(previous) = in_flight.take() {
            previous.abort();
        }

        let pipeline = Arc::clone(&self.pipeline);
        let target = url.to_string();
        let task = tokio::spawn(async move { pipeline.resolve(&target).await });
        *in_flight = Some(task.abort_handle());

        ResolutionHandle {
            url: url.to_string(),
            task,
        }
    }

    /// Abort the in-flight resolution, if any
    pub async fn cancel(&self) {
        if let Some(previous) = self.in_flight.lock().await.take() {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{ContentFetcher, FetchResponse};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Fetcher that answers slowly with a short Markdown document
    struct SlowFetcher;

    #[async_trait]
    impl ContentFetcher for SlowFetcher {
        async fn fetch(&self, url: &str) -> FetchResponse {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if url.contains("r.jina.ai") {
                FetchResponse::success(200, "Title: Slow")
            } else {
                FetchResponse::failed()
            }
        }
    }

    fn slot() -> ResolutionSlot {
        ResolutionSlot::new(Arc::new(MetadataPipeline::new(Arc::new(SlowFetcher))))
    }

    #[tokio::test]
    async fn test_later_submission_supersedes_earlier() {
        let slot = slot();
        let first = slot.submit("https://site.com/a").await;
        let second = slot.submit("https://site.com/b").await;

        assert!(first.wait().await.is_none());
        let result = second.wait().await.unwrap();
        assert_eq!(result.url, "https://site.com/b");
        assert_eq!(result.title.as_deref(), Some("Slow"));
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight() {
        let slot = slot();
        let handle = slot.submit("https://site.com/a").await;
        assert_eq!(handle.url(), "https://site.com/a");
        slot.cancel().await;
        assert!(handle.wait().await.is_none());
    }
}

//! Single-page analysis: fetch one URL and classify its HTML.
//!
//! The analyzer knows nothing about jobs, users or persistence. It turns a URL
//! into a [`PageSnapshot`] or an [`AnalyzeError`], never anything in between.

pub mod fetch;
pub mod html;
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

use std::sync::Arc;

use data_model_lens::models::PageSnapshot;
use url::Url;

pub use fetch::{HttpFetcher, PageFetcher};
pub use html::analyze_html;

/// Why a page could not be analyzed. Every variant carries the attempted URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyzeError {
    #[error("Not a valid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("URL has no host: {url}")]
    MissingHost { url: String },

    /// Transport failure: DNS, connection, timeout, unreadable body.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl AnalyzeError {
    /// The URL whose analysis failed.
    pub fn url(&self) -> &str {
        match self {
            AnalyzeError::InvalidUrl { url, .. }
            | AnalyzeError::MissingHost { url }
            | AnalyzeError::Fetch { url, .. }
            | AnalyzeError::Status { url, .. } => url,
        }
    }
}

/// Fetches a page through a [`PageFetcher`] and classifies it.
#[derive(Clone)]
pub struct PageAnalyzer {
    fetcher: Arc<dyn PageFetcher>,
}

impl PageAnalyzer {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Analyzes the page at `target`, which must be an absolute URL with a host.
    pub async fn analyze(&self, target: &str) -> Result<PageSnapshot, AnalyzeError> {
        let url = Url::parse(target).map_err(|e| AnalyzeError::InvalidUrl {
            url: target.to_string(),
            reason: e.to_string(),
        })?;

        if url.host_str().is_none() {
            return Err(AnalyzeError::MissingHost {
                url: target.to_string(),
            });
        }

        tracing::debug!("Fetching {}", url);
        let body = self.fetcher.fetch(&url).await?;
        tracing::debug!("Fetched {} bytes from {}", body.len(), url);

        Ok(analyze_html(&url, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::mock::MockFetcher;

    #[tokio::test]
    async fn test_analyze_rejects_invalid_url() {
        let analyzer = PageAnalyzer::new(Arc::new(MockFetcher::new()));
        let err = analyzer.analyze("not a url").await.unwrap_err();
        assert!(matches!(err, AnalyzeError::InvalidUrl { .. }));
        assert_eq!(err.url(), "not a url");
    }

    #[tokio::test]
    async fn test_analyze_rejects_url_without_host() {
        let fetcher = Arc::new(MockFetcher::new());
        let analyzer = PageAnalyzer::new(fetcher.clone());

        let err = analyzer.analyze("mailto:someone@example.com").await.unwrap_err();

        assert!(matches!(err, AnalyzeError::MissingHost { .. }));
        assert!(fetcher.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_propagates_http_status() {
        let fetcher = MockFetcher::new().with_status("https://example.com/gone", 410);
        let analyzer = PageAnalyzer::new(Arc::new(fetcher));

        let err = analyzer.analyze("https://example.com/gone").await.unwrap_err();

        assert_eq!(
            err,
            AnalyzeError::Status {
                url: "https://example.com/gone".to_string(),
                status: 410
            }
        );
    }

    #[tokio::test]
    async fn test_analyze_page() {
        let fetcher =
            MockFetcher::new().with_page("https://example.com/", "<!DOCTYPE html><title>Hi</title><h2>Sub</h2>");
        let analyzer = PageAnalyzer::new(Arc::new(fetcher));

        let snapshot = analyzer.analyze("https://example.com/").await.unwrap();

        assert_eq!(snapshot.title, "Hi");
        assert_eq!(snapshot.html_version, "HTML5");
        assert_eq!(snapshot.heading_counts.get("h2"), Some(1));
    }
}

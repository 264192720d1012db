//! Mock page fetcher for testing
//!
//! Serves canned HTML per URL without touching the network, and records
//! every URL it was asked for so tests can assert what was (not) fetched.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::analyzer::{AnalyzeError, PageFetcher};

enum Canned {
    Page(String),
    Status(u16),
    Unreachable,
}

/// Unknown URLs answer 404.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Canned>>,
    fetched: Mutex<Vec<String>>,
}

fn key(url: &str) -> String {
    Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.set_page(url, html);
        self
    }

    /// Answer `url` with an HTTP error status.
    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.insert(url, Canned::Status(status));
        self
    }

    /// Fail `url` at the transport level.
    pub fn with_unreachable(self, url: &str) -> Self {
        self.insert(url, Canned::Unreachable);
        self
    }

    /// Replace what `url` serves, e.g. to simulate the remote page changing.
    pub fn set_page(&self, url: &str, html: &str) {
        self.insert(url, Canned::Page(html.to_string()));
    }

    pub fn set_status(&self, url: &str, status: u16) {
        self.insert(url, Canned::Status(status));
    }

    /// Every URL fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    fn insert(&self, url: &str, canned: Canned) {
        self.responses.lock().unwrap().insert(key(url), canned);
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, AnalyzeError> {
        self.fetched.lock().unwrap().push(url.to_string());

        match self.responses.lock().unwrap().get(url.as_str()) {
            Some(Canned::Page(html)) => Ok(html.clone()),
            Some(Canned::Status(status)) => Err(AnalyzeError::Status {
                url: url.to_string(),
                status: *status,
            }),
            Some(Canned::Unreachable) => Err(AnalyzeError::Fetch {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
            None => Err(AnalyzeError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

use async_trait::async_trait;
use url::Url;

use crate::analyzer::AnalyzeError;
use crate::common::FetchConfig;

/// Interface to the network: one GET, returning the body of a successful response.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, AnalyzeError>;
}

/// Fetches pages over HTTP(S). Non-2xx responses and bodies over
/// `max_body_bytes` are errors.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    fn too_large(&self, url: &Url) -> AnalyzeError {
        AnalyzeError::Fetch {
            url: url.to_string(),
            reason: format!("response body exceeds {} bytes", self.max_body_bytes),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, AnalyzeError> {
        let fetch_error = |e: reqwest::Error| AnalyzeError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let mut response = self.client.get(url.clone()).send().await.map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if response
            .content_length()
            .is_some_and(|declared| declared > self.max_body_bytes as u64)
        {
            return Err(self.too_large(url));
        }

        // Content-Length may be absent or wrong, so the limit is also enforced while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(fetch_error)? {
            if body.len() + chunk.len() > self.max_body_bytes {
                tracing::warn!("Stopped reading {} after {} bytes", url, body.len());
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

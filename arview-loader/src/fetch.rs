//! HTTP fetch of the model body

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use crate::{Error, Result};

/// Fetches a resource's bytes.
pub trait Fetcher: Send + Sync {
    /// Fetch the full body at `url`.
    ///
    /// Only a 200 response counts as success.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// [`Fetcher`] over reqwest. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Client with the transport's default timeouts.
    pub fn new() -> Result<Self> {
        Self::with_timeout(None)
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|e| {
            log::warn!("Not a URL: {:?} ({})", url, e);
            Error::InvalidUrl(url.to_string(), e.to_string())
        })?;

        log::debug!("GET {}", parsed);

        let response = self.client.get(parsed).send().await.map_err(|e| {
            log::warn!("Request to {} failed: {}", url, e);
            Error::Transport(e)
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            log::warn!("Request to {} returned {}", url, status);
            return Err(Error::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            log::warn!("Reading body from {} failed: {}", url, e);
            Error::Transport(e)
        })?;

        log::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

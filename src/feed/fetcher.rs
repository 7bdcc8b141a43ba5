use crate::feed::parser::{parse_feed, ParseError, ParseResult};
use crate::feed::types::FeedSnapshot;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// User agent sent with every feed request unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("feedbell/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while fetching a feed.
///
/// Every variant is handled the same way by the poller: the source
/// contributes nothing this round and its watermark is left alone.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, client timeout, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Feed document could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Retrieves and decodes a feed.
///
/// This is the boundary the poller is written against; [`HttpFetcher`] is the
/// production implementation and tests substitute scripted ones.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the document at `url` and parse it into a snapshot.
    async fn fetch(&self, url: &str) -> Result<FeedSnapshot, FetchError>;
}

/// Fetches feeds over HTTP(S) with a shared [`reqwest::Client`].
///
/// There are no retries: a failed fetch is simply re-attempted on the next
/// polling round.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Wraps an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds a client with the given user agent.
    ///
    /// `timeout` bounds each whole request; `None` leaves the transport
    /// defaults in place.
    pub fn build(user_agent: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(builder.build()?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FeedSnapshot, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;

        let ParseResult { snapshot, skipped } = parse_feed(&bytes)?;
        if skipped > 0 {
            tracing::debug!(
                feed = %url,
                skipped = skipped,
                "Entries without a timestamp skipped"
            );
        }

        Ok(snapshot)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

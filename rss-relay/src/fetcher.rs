use crate::traits::Downloader;
use crate::types::{FetchConfig, FetchResult, RelayError, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use md5::{Digest, Md5};
use reqwest::{Client, Response, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// Download a feed document, retrying transport errors and non-success
    /// statuses with exponential backoff.
    pub async fn fetch_feed(&self, url: &str, etag: Option<&str>, last_modified: Option<&str>) -> Result<FetchResult> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(self.config.retry_delay_seconds),
            initial_interval: Duration::from_secs(self.config.retry_delay_seconds),
            max_interval: Duration::from_secs(self.config.retry_delay_seconds * 32),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.retry_delay_seconds * 60)),
            ..Default::default()
        };

        let mut last_error = String::from("no attempt made");

        for attempt in 0..=self.config.max_retries {
            match self.fetch_with_conditional_headers(url, etag, last_modified).await {
                Ok(response) => {
                    let status = response.status();

                    if status == StatusCode::NOT_MODIFIED {
                        debug!("Feed not modified: {}", url);
                        return Ok(FetchResult {
                            http_status: status.as_u16(),
                            etag: etag.map(|s| s.to_string()),
                            last_modified: last_modified.map(|s| s.to_string()),
                            content: None,
                            response_time_ms: start_time.elapsed().as_millis() as u64,
                        });
                    }

                    if status.is_success() {
                        return self.read_body(url, response, start_time).await;
                    }

                    last_error = format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or("Unknown"));
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < self.config.max_retries {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {} failed for {} ({}), retrying in {:?}", attempt + 1, url, last_error, delay);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
            break;
        }

        Err(RelayError::Fetch {
            url: url.to_string(),
            reason: last_error,
        })
    }

    async fn read_body(&self, url: &str, response: Response, start_time: Instant) -> Result<FetchResult> {
        let status = response.status();
        let max_bytes = self.config.max_feed_size_mb * 1024 * 1024;

        // Extract headers for conditional requests on the next tick
        let etag = header_value(&response, "etag");
        let last_modified = header_value(&response, "last-modified");

        if let Some(content_length) = response.content_length() {
            if content_length > max_bytes as u64 {
                return Err(RelayError::Fetch {
                    url: url.to_string(),
                    reason: format!("Feed too large: {} bytes", content_length),
                });
            }
        }

        let content = response.text().await.map_err(|e| RelayError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if content.len() > max_bytes {
            return Err(RelayError::Fetch {
                url: url.to_string(),
                reason: format!("Feed too large: {} bytes", content.len()),
            });
        }

        info!("Successfully fetched feed: {} ({} bytes)", url, content.len());
        Ok(FetchResult {
            http_status: status.as_u16(),
            etag,
            last_modified,
            content: Some(content),
            response_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    async fn fetch_with_conditional_headers(&self, url: &str, etag: Option<&str>, last_modified: Option<&str>) -> Result<Response> {
        let mut request = self.client.get(url);

        if let Some(etag) = etag {
            request = request.header("If-None-Match", etag);
        }

        if let Some(last_modified) = last_modified {
            request = request.header("If-Modified-Since", last_modified);
        }

        let response = request.send().await?;
        Ok(response)
    }
}

/// Streams media through the hasher, used to look uploads up by content.
#[async_trait]
impl Downloader for Fetcher {
    async fn content_md5(&self, url: &str) -> Result<String> {
        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(RelayError::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status().as_u16()),
            });
        }

        let max_bytes = (self.config.max_media_size_mb * 1024 * 1024) as u64;
        let too_large = |size: u64| RelayError::Fetch {
            url: url.to_string(),
            reason: format!("Media too large: {} bytes", size),
        };

        if let Some(content_length) = response.content_length() {
            if content_length > max_bytes {
                return Err(too_large(content_length));
            }
        }

        let mut hasher = Md5::new();
        let mut total: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            total += chunk.len() as u64;
            if total > max_bytes {
                return Err(too_large(total));
            }
            hasher.update(&chunk);
        }

        debug!("Hashed {} ({} bytes)", url, total);
        Ok(hex::encode(hasher.finalize()))
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

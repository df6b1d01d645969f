//! Upload-then-lookup of remote media.
//!
//! The drive ingests a URL asynchronously and answers the upload before the
//! file is guaranteed to be listed. The resolver therefore looks the file up
//! again under a [`RetryPolicy`]: an empty answer is "not there yet", an
//! error is final.

use crate::rss_utils;
use crate::traits::{Downloader, MediaStore, Sleeper, TokioSleeper};
use crate::types::{MediaItem, RelayError, ResolveFailure, Result, RetryPolicy};
use md5::{Digest, Md5};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What the store is asked to match a file by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKey {
    /// Hex MD5 of the file contents.
    Md5(String),
    /// File name the store derived from the source URL.
    Name(String),
    /// Comment attached to the file at upload time.
    Comment(String),
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKey::Md5(hash) => write!(f, "md5 {}", hash),
            MatchKey::Name(name) => write!(f, "name {}", name),
            MatchKey::Comment(tag) => write!(f, "comment {}", tag),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Download the media and look it up by content hash.
    #[default]
    Hash,
    /// Look up by the file name taken from the source URL.
    Url,
    /// Attach a unique tag at upload time and look that up.
    Tag,
}

pub fn md5_hex(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

pub struct MediaResolver {
    store: Arc<dyn MediaStore>,
    downloader: Arc<dyn Downloader>,
    strategy: MatchStrategy,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl MediaResolver {
    pub fn new(
        store: Arc<dyn MediaStore>,
        downloader: Arc<dyn Downloader>,
        strategy: MatchStrategy,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            downloader,
            strategy,
            retry,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Resolve every item in order, stopping at the first failure. Returns the
    /// drive ids in the same order as `items`.
    pub async fn resolve_all(&self, items: &mut [MediaItem]) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(items.len());
        for item in items.iter_mut() {
            ids.push(self.resolve_item(item).await?);
        }
        Ok(ids)
    }

    /// Upload one item and fill in its drive id.
    pub async fn resolve_item(&self, item: &mut MediaItem) -> Result<String> {
        let url = item.source_url.clone();
        info!("Uploading media: {}", url);

        let tag = match self.strategy {
            MatchStrategy::Tag => Some(Uuid::new_v4().to_string()),
            MatchStrategy::Hash | MatchStrategy::Url => None,
        };

        self.store.upload_from_url(&url, tag.as_deref()).await?;
        debug!("Upload of {} accepted", url);

        let key = self.match_key(&url, tag).await?;
        let id = self.resolve(&url, &key).await?;

        info!("Media {} resolved to drive file {}", url, id);
        item.resolved_id = Some(id.clone());
        Ok(id)
    }

    async fn match_key(&self, url: &str, tag: Option<String>) -> Result<MatchKey> {
        let resolve_error = |reason: String| RelayError::Resolve {
            url: url.to_string(),
            reason: ResolveFailure::Api(reason),
        };

        match (self.strategy, tag) {
            (MatchStrategy::Tag, Some(tag)) => Ok(MatchKey::Comment(tag)),
            (MatchStrategy::Url, _) => rss_utils::url::file_name(url)
                .map(MatchKey::Name)
                .ok_or_else(|| resolve_error("source URL has no file name".to_string())),
            _ => {
                let md5 = self
                    .downloader
                    .content_md5(url)
                    .await
                    .map_err(|e| resolve_error(format!("download for hashing failed: {}", e)))?;
                Ok(MatchKey::Md5(md5))
            }
        }
    }

    /// Look `key` up under the retry policy. A miss waits `backoff` and tries
    /// again until `max_attempts` lookups have been made; an error stops
    /// immediately.
    pub async fn resolve(&self, url: &str, key: &MatchKey) -> Result<String> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_failure = ResolveFailure::NotFound { attempts: 0 };

        for attempt in 1..=max_attempts {
            match self.store.find(key).await {
                Ok(Some(id)) if !id.trim().is_empty() => return Ok(id),
                Ok(Some(_)) => {
                    warn!("Store returned an empty id for {} ({})", url, key);
                    last_failure = ResolveFailure::Empty;
                }
                Ok(None) => {
                    last_failure = ResolveFailure::NotFound { attempts: attempt };
                }
                Err(e) => {
                    return Err(RelayError::Resolve {
                        url: url.to_string(),
                        reason: ResolveFailure::Api(e.to_string()),
                    });
                }
            }

            if attempt < max_attempts {
                warn!(
                    "Media {} not listed yet, retrying in {:?} (attempt {}/{})",
                    url, self.retry.backoff, attempt, max_attempts
                );
                self.sleeper.sleep(self.retry.backoff).await;
            }
        }

        Err(RelayError::Resolve {
            url: url.to_string(),
            reason: last_failure,
        })
    }
}

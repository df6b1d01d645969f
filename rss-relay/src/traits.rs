use crate::media::MatchKey;
use crate::types::{Feed, PostPayload, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Trait for retrieving and parsing a syndication feed by URL
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed at `url`.
    /// An unchanged feed yields the last document seen for `url`; `None` means
    /// the server reported no change and there is nothing to replay.
    async fn fetch(&self, url: &str) -> Result<Option<Feed>>;
}

/// Drive-like store that ingests media by remote URL
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Ask the store to download `url` into the drive. `comment` is attached
    /// to the stored file when given.
    async fn upload_from_url(&self, url: &str, comment: Option<&str>) -> Result<()>;

    /// Look up a previously uploaded file. `Ok(None)` means the store does not
    /// list it (yet).
    async fn find(&self, key: &MatchKey) -> Result<Option<String>>;
}

/// Remote social API accepting new notes
#[async_trait]
pub trait NoteApi: Send + Sync {
    async fn create_note(&self, payload: &PostPayload) -> Result<()>;
}

/// Fingerprints a remote media resource without holding it in memory
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Hex MD5 of the resource body.
    async fn content_md5(&self, url: &str) -> Result<String>;
}

/// Suspends the current task. Injected so retry delays can be observed in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

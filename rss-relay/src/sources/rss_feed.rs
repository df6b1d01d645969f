use crate::traits::FeedSource;
use crate::types::{Feed, FetchConfig, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Last document parsed for a URL and the validators it came with
#[derive(Debug, Clone)]
struct CachedFeed {
    etag: Option<String>,
    last_modified: Option<String>,
    feed: Feed,
}

/// RSS/Atom source over HTTP. Remembers ETag / Last-Modified per URL so an
/// unchanged feed costs a 304 instead of a full download. A 304 replays the
/// cached document, leaving the "already published?" decision to dedup.
pub struct RssFeedSource {
    fetcher: Fetcher,
    parser: FeedParser,
    cache: RwLock<HashMap<String, CachedFeed>>,
}

impl RssFeedSource {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
            parser: FeedParser::new(),
            cache: RwLock::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch(&self, url: &str) -> Result<Option<Feed>> {
        let previous = self.cache.read().await.get(url).cloned();
        let (etag, last_modified) = match &previous {
            Some(cached) => (cached.etag.as_deref(), cached.last_modified.as_deref()),
            None => (None, None),
        };

        let fetch_result = self.fetcher.fetch_feed(url, etag, last_modified).await?;

        let content = match fetch_result.content {
            Some(content) => content,
            None => {
                debug!("Feed {} unchanged (HTTP {})", url, fetch_result.http_status);
                return Ok(previous.map(|cached| cached.feed));
            }
        };

        let feed = self.parser.parse_feed(&content)?;

        // Only remember documents that parsed
        self.cache.write().await.insert(
            url.to_string(),
            CachedFeed {
                etag: fetch_result.etag,
                last_modified: fetch_result.last_modified,
                feed: feed.clone(),
            },
        );

        if feed.entries.is_empty() {
            warn!("Feed {} has no entries", url);
        }

        info!(
            "Pulled feed {} ({} entries) in {}ms",
            feed.title.as_deref().unwrap_or(url),
            feed.entries.len(),
            fetch_result.response_time_ms
        );
        Ok(Some(feed))
    }
}

use crate::dedup::{DedupKey, DedupStrategy, DedupTracker};
use crate::media::MediaResolver;
use crate::normalize::Normalizer;
use crate::publisher::Publisher;
use crate::traits::FeedSource;
use crate::types::{Feed, FeedEntry, PipelineStage, RelayError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How one feed's pass ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// A note was created and the dedup baseline advanced to `key`.
    Published { key: DedupKey, media: usize },
    /// The newest entry was already published, or the feed was not modified.
    Unchanged,
    /// First sight of the feed with priming enabled; `key` became the baseline.
    Primed { key: DedupKey },
    /// The feed has no entries.
    Empty,
    /// The newest entry has no usable dedup key under the configured strategy.
    MissingKey,
}

/// A pass aborted at `stage`. The dedup baseline was not touched.
#[derive(Debug)]
pub struct FeedFailure {
    pub stage: PipelineStage,
    pub error: RelayError,
}

impl FeedFailure {
    fn new(stage: PipelineStage, error: RelayError) -> Self {
        Self { stage, error }
    }
}

#[derive(Debug)]
pub struct FeedReport {
    pub url: String,
    pub result: Result<FeedOutcome, FeedFailure>,
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub feeds: Vec<FeedReport>,
}

impl TickReport {
    pub fn published(&self) -> usize {
        self.feeds
            .iter()
            .filter(|report| matches!(report.result, Ok(FeedOutcome::Published { .. })))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.feeds.iter().filter(|report| report.result.is_err()).count()
    }
}

/// A configured feed and the baseline of what has been published from it.
struct WatchedFeed {
    url: String,
    tracker: Arc<DedupTracker>,
}

/// Drives fetch → normalize → dedup → media → publish → commit for every
/// configured feed, one feed at a time.
pub struct RelayPipeline {
    feeds: Vec<WatchedFeed>,
    source: Arc<dyn FeedSource>,
    normalizer: Normalizer,
    resolver: MediaResolver,
    publisher: Publisher,
    prime_on_start: bool,
}

impl RelayPipeline {
    pub fn new(
        feed_urls: &[String],
        strategy: DedupStrategy,
        source: Arc<dyn FeedSource>,
        normalizer: Normalizer,
        resolver: MediaResolver,
        publisher: Publisher,
    ) -> Self {
        let mut feeds: Vec<WatchedFeed> = Vec::with_capacity(feed_urls.len());
        for url in feed_urls {
            if feeds.iter().any(|feed| &feed.url == url) {
                warn!("Feed {} configured twice, watching it once", url);
                continue;
            }
            feeds.push(WatchedFeed {
                url: url.clone(),
                tracker: Arc::new(DedupTracker::new(strategy)),
            });
        }

        Self {
            feeds,
            source,
            normalizer,
            resolver,
            publisher,
            prime_on_start: false,
        }
    }

    /// Seed each feed's baseline with its newest entry on first sight instead
    /// of publishing it.
    pub fn with_prime_on_start(mut self, prime_on_start: bool) -> Self {
        self.prime_on_start = prime_on_start;
        self
    }

    pub fn feed_urls(&self) -> Vec<&str> {
        self.feeds.iter().map(|feed| feed.url.as_str()).collect()
    }

    /// Dedup tracker of a configured feed.
    pub fn tracker(&self, url: &str) -> Option<Arc<DedupTracker>> {
        self.feeds
            .iter()
            .find(|feed| feed.url == url)
            .map(|feed| feed.tracker.clone())
    }

    /// One scheduler tick. A failing feed never stops the feeds after it.
    pub async fn run_tick(&self) -> TickReport {
        info!("Retrieving the latest entries of {} feeds", self.feeds.len());
        let mut report = TickReport::default();

        for feed in &self.feeds {
            let result = self.process_feed(feed).await;
            match &result {
                Ok(FeedOutcome::Published { key, media }) => {
                    info!("Feed {}: published {} with {} media", feed.url, key, media);
                }
                Ok(outcome) => debug!("Feed {}: {:?}", feed.url, outcome),
                Err(failure) => {
                    error!("Feed {} aborted while {}: {}", feed.url, failure.stage, failure.error);
                }
            }
            report.feeds.push(FeedReport {
                url: feed.url.clone(),
                result,
            });
        }

        info!(
            "Tick finished: {} published, {} failed, {} feeds",
            report.published(),
            report.failed(),
            report.feeds.len()
        );
        report
    }

    async fn process_feed(&self, feed: &WatchedFeed) -> Result<FeedOutcome, FeedFailure> {
        let fetched = self
            .source
            .fetch(&feed.url)
            .await
            .map_err(|e| FeedFailure::new(PipelineStage::Fetching, e))?;

        let fetched = match fetched {
            Some(fetched) => fetched,
            None => return Ok(FeedOutcome::Unchanged),
        };
        debug!(
            "Feed title: {:?}, link: {:?}, description: {:?}",
            fetched.title, fetched.link, fetched.description
        );

        let strategy = feed.tracker.strategy();
        let entry = match newest_entry(&fetched, strategy) {
            Some(entry) => entry,
            None => return Ok(FeedOutcome::Empty),
        };

        let mut content = self.normalizer.normalize(&entry.raw_content);
        debug!(
            "Normalized entry {:?}: {} chars, {} media",
            entry.title,
            content.text.chars().count(),
            content.media.len()
        );

        let key = match strategy.key_for(entry) {
            Some(key) => key,
            None => {
                warn!("Newest entry of {} has no usable {:?} key, skipping", feed.url, strategy);
                return Ok(FeedOutcome::MissingKey);
            }
        };

        if self.prime_on_start && feed.tracker.prime(key.clone()).await {
            info!("Feed {}: baseline set to {} without publishing", feed.url, key);
            return Ok(FeedOutcome::Primed { key });
        }

        if !feed.tracker.is_new(&key).await {
            return Ok(FeedOutcome::Unchanged);
        }

        // Nothing is posted unless every media item resolved
        let media_ids = self
            .resolver
            .resolve_all(&mut content.media)
            .await
            .map_err(|e| FeedFailure::new(PipelineStage::ResolvingMedia, e))?;

        self.publisher
            .publish(&content.text, media_ids)
            .await
            .map_err(|e| FeedFailure::new(PipelineStage::Publishing, e))?;
        info!("Posted to Misskey: {}", entry.title);

        feed.tracker.set(key.clone()).await;

        Ok(FeedOutcome::Published {
            key,
            media: content.media.len(),
        })
    }
}

/// The entry the pipeline considers for publishing. Feeds list newest first;
/// under the timestamp strategy the latest publication date wins instead.
fn newest_entry(feed: &Feed, strategy: DedupStrategy) -> Option<&FeedEntry> {
    match strategy {
        DedupStrategy::Guid => feed.newest(),
        DedupStrategy::Published => feed
            .entries
            .iter()
            .filter(|entry| entry.published_at.is_some())
            .max_by_key(|entry| entry.published_at)
            .or_else(|| feed.newest()),
    }
}

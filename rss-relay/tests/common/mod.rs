#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rss_relay::{
    DedupStrategy, Downloader, Feed, FeedEntry, FeedSource, MatchKey, MatchStrategy, MediaResolver, MediaStore,
    Normalizer, NoteApi, PostPayload, Publisher, RelayError, RelayPipeline, Result, RetryPolicy, Sleeper, Visibility,
};
use rss_relay::media::md5_hex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

pub fn entry(id: &str, body: &str) -> FeedEntry {
    FeedEntry {
        id: id.to_string(),
        title: format!("Entry {}", id),
        link: Some(format!("https://example.com/{}", id)),
        raw_content: body.to_string(),
        published_at: None,
    }
}

pub fn entry_at(id: &str, body: &str, published_at: DateTime<Utc>) -> FeedEntry {
    FeedEntry {
        published_at: Some(published_at),
        ..entry(id, body)
    }
}

pub fn feed(entries: Vec<FeedEntry>) -> Feed {
    Feed {
        title: Some("Test feed".to_string()),
        description: None,
        link: Some("https://example.com".to_string()),
        entries,
    }
}

#[derive(Clone)]
pub enum FakeResponse {
    Feed(Feed),
    NotModified,
    Fail,
}

/// Serves whatever feed was last scripted for a URL.
#[derive(Default)]
pub struct FakeFeedSource {
    responses: Mutex<HashMap<String, FakeResponse>>,
    fetches: AtomicUsize,
}

impl FakeFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, feed: Feed) {
        self.script(url, FakeResponse::Feed(feed));
    }

    pub fn script(&self, url: &str, response: FakeResponse) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for FakeFeedSource {
    async fn fetch(&self, url: &str) -> Result<Option<Feed>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(FakeResponse::Feed(feed)) => Ok(Some(feed)),
            Some(FakeResponse::NotModified) => Ok(None),
            Some(FakeResponse::Fail) | None => Err(RelayError::Fetch {
                url: url.to_string(),
                reason: "HTTP 500: Internal Server Error".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FindReply {
    Found(String),
    Missing,
    Empty,
    Error,
}

/// Drive stand-in. Lookups answer from a script; once the script runs out
/// every lookup misses.
#[derive(Default)]
pub struct FakeMediaStore {
    replies: Mutex<VecDeque<FindReply>>,
    uploads: Mutex<Vec<(String, Option<String>)>>,
    finds: Mutex<Vec<MatchKey>>,
    fail_uploads: AtomicBool,
}

impl FakeMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<FindReply>) -> Self {
        let store = Self::default();
        store.push_replies(replies);
        store
    }

    pub fn push_replies(&self, replies: Vec<FindReply>) {
        self.replies.lock().unwrap().extend(replies);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> Vec<(String, Option<String>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn finds(&self) -> Vec<MatchKey> {
        self.finds.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn upload_from_url(&self, url: &str, comment: Option<&str>) -> Result<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(RelayError::Upload {
                url: url.to_string(),
                status: 500,
            });
        }
        self.uploads
            .lock()
            .unwrap()
            .push((url.to_string(), comment.map(|c| c.to_string())));
        Ok(())
    }

    async fn find(&self, key: &MatchKey) -> Result<Option<String>> {
        self.finds.lock().unwrap().push(key.clone());
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(FindReply::Missing);
        match reply {
            FindReply::Found(id) => Ok(Some(id)),
            FindReply::Missing => Ok(None),
            FindReply::Empty => Ok(Some(String::new())),
            FindReply::Error => Err(RelayError::Api {
                endpoint: "drive/files/find-by-hash".to_string(),
                status: 500,
            }),
        }
    }
}

/// Records every note it accepts.
#[derive(Default)]
pub struct FakeNoteApi {
    notes: Mutex<Vec<PostPayload>>,
    fail: AtomicBool,
}

impl FakeNoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn notes(&self) -> Vec<PostPayload> {
        self.notes.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.notes().into_iter().map(|note| note.text).collect()
    }
}

#[async_trait]
impl NoteApi for FakeNoteApi {
    async fn create_note(&self, payload: &PostPayload) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RelayError::Publish {
                status: 500,
                body: "{\"error\":\"INTERNAL_ERROR\"}".to_string(),
            });
        }
        self.notes.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Hashes the URL itself as if it were the file contents.
#[derive(Default)]
pub struct FakeDownloader {
    broken: Mutex<HashSet<String>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn break_url(&self, url: &str) {
        self.broken.lock().unwrap().insert(url.to_string());
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn content_md5(&self, url: &str) -> Result<String> {
        if self.broken.lock().unwrap().contains(url) {
            return Err(RelayError::Fetch {
                url: url.to_string(),
                reason: "HTTP 404".to_string(),
            });
        }
        Ok(md5_hex(url.as_bytes()))
    }
}

/// Records requested delays without waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn resolver(
    store: Arc<FakeMediaStore>,
    strategy: MatchStrategy,
    sleeper: Arc<RecordingSleeper>,
) -> MediaResolver {
    MediaResolver::new(store, Arc::new(FakeDownloader::new()), strategy, RetryPolicy::default()).with_sleeper(sleeper)
}

/// Everything a pipeline test needs to script and observe.
pub struct Harness {
    pub source: Arc<FakeFeedSource>,
    pub store: Arc<FakeMediaStore>,
    pub notes: Arc<FakeNoteApi>,
    pub sleeper: Arc<RecordingSleeper>,
    pub pipeline: RelayPipeline,
}

impl Harness {
    pub fn new(feed_urls: &[&str], strategy: DedupStrategy) -> Self {
        Self::build(feed_urls, strategy, false)
    }

    pub fn primed(feed_urls: &[&str], strategy: DedupStrategy) -> Self {
        Self::build(feed_urls, strategy, true)
    }

    fn build(feed_urls: &[&str], strategy: DedupStrategy, prime_on_start: bool) -> Self {
        let source = Arc::new(FakeFeedSource::new());
        let store = Arc::new(FakeMediaStore::new());
        let notes = Arc::new(FakeNoteApi::new());
        let sleeper = Arc::new(RecordingSleeper::new());

        let urls: Vec<String> = feed_urls.iter().map(|url| url.to_string()).collect();
        let pipeline = RelayPipeline::new(
            &urls,
            strategy,
            source.clone(),
            Normalizer::default(),
            resolver(store.clone(), MatchStrategy::Hash, sleeper.clone()),
            Publisher::new(notes.clone(), Visibility::Public),
        )
        .with_prime_on_start(prime_on_start);

        Self {
            source,
            store,
            notes,
            sleeper,
            pipeline,
        }
    }
}

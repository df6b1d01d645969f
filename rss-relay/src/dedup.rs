use crate::types::FeedEntry;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::RwLock;
use tracing::debug;

/// Value recorded for the last entry that was published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupKey {
    Guid(String),
    Published(DateTime<Utc>),
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupKey::Guid(guid) => write!(f, "guid {}", guid),
            DedupKey::Published(at) => write!(f, "published {}", at.to_rfc3339()),
        }
    }
}

/// How entries are identified and compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupStrategy {
    /// New when the GUID differs from the last published one.
    #[default]
    Guid,
    /// New when published strictly after the last published entry.
    Published,
}

impl DedupStrategy {
    /// Key of `entry` under this strategy, `None` if the entry lacks one.
    pub fn key_for(&self, entry: &FeedEntry) -> Option<DedupKey> {
        match self {
            DedupStrategy::Guid => {
                let guid = entry.id.trim();
                (!guid.is_empty()).then(|| DedupKey::Guid(guid.to_string()))
            }
            DedupStrategy::Published => entry.published_at.map(DedupKey::Published),
        }
    }

    /// Strict "is newer" comparison. Equal values are never newer, and keys of
    /// a different kind than the strategy's are never newer.
    pub fn is_newer(&self, candidate: &DedupKey, last: Option<&DedupKey>) -> bool {
        match (self, candidate, last) {
            (DedupStrategy::Guid, DedupKey::Guid(_), None) => true,
            (DedupStrategy::Published, DedupKey::Published(_), None) => true,
            (DedupStrategy::Guid, DedupKey::Guid(c), Some(DedupKey::Guid(l))) => c != l,
            (DedupStrategy::Published, DedupKey::Published(c), Some(DedupKey::Published(l))) => c > l,
            _ => false,
        }
    }
}

/// Holds the key of the last successfully published entry of one feed.
#[derive(Debug, Default)]
pub struct DedupTracker {
    strategy: DedupStrategy,
    last: RwLock<Option<DedupKey>>,
}

impl DedupTracker {
    pub fn new(strategy: DedupStrategy) -> Self {
        Self {
            strategy,
            last: RwLock::new(None),
        }
    }

    pub fn strategy(&self) -> DedupStrategy {
        self.strategy
    }

    pub async fn get(&self) -> Option<DedupKey> {
        self.last.read().await.clone()
    }

    pub async fn set(&self, key: DedupKey) {
        let mut last = self.last.write().await;
        debug!("Dedup baseline moved to {}", key);
        *last = Some(key);
    }

    pub async fn is_new(&self, candidate: &DedupKey) -> bool {
        let last = self.last.read().await;
        self.strategy.is_newer(candidate, last.as_ref())
    }

    /// Record `key` only if nothing has been recorded yet. Returns whether
    /// the baseline was seeded.
    pub async fn prime(&self, key: DedupKey) -> bool {
        let mut last = self.last.write().await;
        if last.is_some() {
            return false;
        }
        debug!("Dedup baseline seeded with {}", key);
        *last = Some(key);
        true
    }
}

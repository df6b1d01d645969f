use std::fmt;
use std::time::Duration;

pub use interfaces::defs::{Feed, FeedEntry, MediaItem, PostPayload, Visibility};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    /// Cap on media streamed for content hashing.
    pub max_media_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "RSS-Relay/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_seconds: 5,
            max_feed_size_mb: 10,
            max_media_size_mb: 50,
            max_redirects: 5,
        }
    }
}

/// Result of a single feed download.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub http_status: u16,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    /// `None` when the server answered 304 Not Modified.
    pub content: Option<String>,
    pub response_time_ms: u64,
}

/// Bounded retry for the media lookup that races the store's ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of lookups, including the first one.
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(3),
        }
    }
}

/// States of one feed's pass through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Fetching,
    Normalizing,
    CheckingDedup,
    ResolvingMedia,
    Publishing,
    Committing,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Fetching => "fetching",
            PipelineStage::Normalizing => "normalizing",
            PipelineStage::CheckingDedup => "checking dedup",
            PipelineStage::ResolvingMedia => "resolving media",
            PipelineStage::Publishing => "publishing",
            PipelineStage::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// Why a media item could not be turned into a drive file id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    /// The store never listed the upload within the retry budget.
    NotFound { attempts: u32 },
    /// The store answered with a blank id.
    Empty,
    /// Transport or API error from the lookup itself.
    Api(String),
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveFailure::NotFound { attempts } => {
                write!(f, "not found after {} attempts", attempts)
            }
            ResolveFailure::Empty => write!(f, "store returned an empty id"),
            ResolveFailure::Api(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to fetch feed {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Upload of {url} rejected with status {status}")]
    Upload { url: String, status: u16 },

    #[error("Could not resolve media {url}: {reason}")]
    Resolve { url: String, reason: ResolveFailure },

    #[error("Note creation failed with status {status}: {body}")]
    Publish { status: u16, body: String },

    #[error("API call {endpoint} failed with status {status}")]
    Api { endpoint: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

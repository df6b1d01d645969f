pub mod types;
pub mod traits;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod normalize;
pub mod dedup;
pub mod media;
pub mod misskey;
pub mod publisher;
pub mod pipeline;
pub mod scheduler;
pub mod rss_utils;

pub use types::*;
pub use traits::{Downloader, FeedSource, MediaStore, NoteApi, Sleeper, TokioSleeper};
pub use config::{Cli, RelayConfig};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::RssFeedSource;
pub use normalize::{NormalizeStage, NormalizedContent, Normalizer};
pub use dedup::{DedupKey, DedupStrategy, DedupTracker};
pub use media::{MatchKey, MatchStrategy, MediaResolver};
pub use misskey::MisskeyClient;
pub use publisher::Publisher;
pub use pipeline::{FeedFailure, FeedOutcome, FeedReport, RelayPipeline, TickReport};
pub use scheduler::Scheduler;

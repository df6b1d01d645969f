use crate::dedup::DedupStrategy;
use crate::media::MatchStrategy;
use crate::normalize::DEFAULT_QUOTE_MARKER;
use crate::rss_utils;
use crate::types::{FetchConfig, RelayError, Result, RetryPolicy, Visibility};
use clap::{Parser, ValueEnum};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DedupArg {
    Guid,
    Published,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatchArg {
    Hash,
    Url,
    Tag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VisibilityArg {
    Public,
    Home,
    Followers,
}

/// Relay new RSS/Atom entries to Misskey notes.
#[derive(Debug, Parser)]
#[command(name = "rss-relay", version, about)]
pub struct Cli {
    /// Misskey host, e.g. `misskey.io` (https assumed) or a full base URL
    #[arg(long, env = "MISSKEY_HOST")]
    pub misskey_host: String,

    /// API token with drive and note permissions
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: String,

    /// Feed URLs to watch, repeated or comma separated
    #[arg(long = "rss-url", env = "RSS_URL", value_delimiter = ',', required = true)]
    pub rss_urls: Vec<String>,

    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 300)]
    pub poll_interval_secs: u64,

    #[arg(long, env = "DEDUP_STRATEGY", value_enum, default_value_t = DedupArg::Guid)]
    pub dedup_strategy: DedupArg,

    #[arg(long, env = "MATCH_STRATEGY", value_enum, default_value_t = MatchArg::Hash)]
    pub match_strategy: MatchArg,

    /// Lookups made for an uploaded file before giving up
    #[arg(long, env = "RESOLVE_ATTEMPTS", default_value_t = 2)]
    pub resolve_attempts: u32,

    /// Wait between lookups of an uploaded file
    #[arg(long, env = "RESOLVE_BACKOFF_SECS", default_value_t = 3)]
    pub resolve_backoff_secs: u64,

    #[arg(long = "visibility", env = "NOTE_VISIBILITY", value_enum, default_value_t = VisibilityArg::Public)]
    pub visibility: VisibilityArg,

    #[arg(long, env = "QUOTE_MARKER", default_value = DEFAULT_QUOTE_MARKER)]
    pub quote_marker: String,

    /// Leave RSSHub quote blocks untouched
    #[arg(long, env = "NO_QUOTE_REWRITE")]
    pub no_quote_rewrite: bool,

    /// Treat the newest entry seen at startup as already published.
    /// Without it every restart reposts each feed's newest entry once, since
    /// nothing is remembered across restarts. With it, an entry that arrived
    /// while the relay was down is never posted.
    #[arg(long, env = "PRIME_ON_START")]
    pub prime_on_start: bool,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Retries of a failed feed download within one tick
    #[arg(long, env = "FETCH_RETRIES", default_value_t = 2)]
    pub fetch_retries: u32,

    /// Largest media file downloaded for content hashing
    #[arg(long, env = "MAX_MEDIA_SIZE_MB", default_value_t = 50)]
    pub max_media_size_mb: usize,

    /// Run a single pass and exit
    #[arg(long)]
    pub once: bool,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub misskey_host: String,
    pub auth_token: String,
    pub feed_urls: Vec<String>,
    pub poll_interval: Duration,
    pub dedup_strategy: DedupStrategy,
    pub match_strategy: MatchStrategy,
    pub retry: RetryPolicy,
    pub visibility: Visibility,
    pub quote_marker: Option<String>,
    pub prime_on_start: bool,
    pub request_timeout: Duration,
    pub fetch: FetchConfig,
    pub run_once: bool,
}

impl Cli {
    pub fn into_config(self) -> Result<RelayConfig> {
        if self.misskey_host.trim().is_empty() {
            return Err(RelayError::Config("MISSKEY_HOST must not be empty".to_string()));
        }
        if self.auth_token.trim().is_empty() {
            return Err(RelayError::Config("AUTH_TOKEN must not be empty".to_string()));
        }
        rss_utils::url::api_base(&self.misskey_host)?;

        let feed_urls: Vec<String> = self
            .rss_urls
            .iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();
        if feed_urls.is_empty() {
            return Err(RelayError::Config("at least one RSS_URL is required".to_string()));
        }
        if let Some(bad) = feed_urls.iter().find(|url| !rss_utils::url::is_valid_feed_url(url)) {
            return Err(RelayError::Config(format!("not an http(s) feed URL: {}", bad)));
        }

        if self.poll_interval_secs == 0 {
            return Err(RelayError::Config("poll interval must be at least one second".to_string()));
        }
        if self.max_media_size_mb == 0 {
            return Err(RelayError::Config("media size cap must be at least 1 MB".to_string()));
        }
        if self.resolve_attempts == 0 {
            return Err(RelayError::Config("resolve attempts must be at least 1".to_string()));
        }

        let fetch = FetchConfig {
            timeout_seconds: self.request_timeout_secs,
            max_retries: self.fetch_retries,
            max_media_size_mb: self.max_media_size_mb,
            ..FetchConfig::default()
        };

        Ok(RelayConfig {
            misskey_host: self.misskey_host,
            auth_token: self.auth_token,
            feed_urls,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            dedup_strategy: match self.dedup_strategy {
                DedupArg::Guid => DedupStrategy::Guid,
                DedupArg::Published => DedupStrategy::Published,
            },
            match_strategy: match self.match_strategy {
                MatchArg::Hash => MatchStrategy::Hash,
                MatchArg::Url => MatchStrategy::Url,
                MatchArg::Tag => MatchStrategy::Tag,
            },
            retry: RetryPolicy {
                max_attempts: self.resolve_attempts,
                backoff: Duration::from_secs(self.resolve_backoff_secs),
            },
            visibility: match self.visibility {
                VisibilityArg::Public => Visibility::Public,
                VisibilityArg::Home => Visibility::Home,
                VisibilityArg::Followers => Visibility::Followers,
            },
            quote_marker: (!self.no_quote_rewrite).then_some(self.quote_marker),
            prime_on_start: self.prime_on_start,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            fetch,
            run_once: self.once,
        })
    }
}

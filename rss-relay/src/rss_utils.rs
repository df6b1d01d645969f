//! RSS-specific utility functions for the relay

/// URL utilities for feeds and the remote API
pub mod url {
    use url::{ParseError, Url};

    /// Validate feed URL format
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            (url.scheme() == "http" || url.scheme() == "https") && url.host().is_some()
        } else {
            false
        }
    }

    /// Last non-empty path segment, the name a drive gives a file ingested
    /// from this URL.
    pub fn file_name(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        url.path_segments()?
            .filter(|segment| !segment.is_empty())
            .next_back()
            .map(|segment| segment.to_string())
    }

    /// Base URL of the remote API. A bare host name is served over https.
    pub fn api_base(host: &str) -> Result<Url, ParseError> {
        let host = host.trim().trim_end_matches('/');
        let with_scheme = if host.contains("://") {
            format!("{}/", host)
        } else {
            format!("https://{}/", host)
        };
        Url::parse(&with_scheme)
    }
}

/// Time utilities for polling
pub mod time {
    use std::time::Duration;

    /// Format duration in human-readable form
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();

        if total_seconds < 60 {
            format!("{}s", total_seconds)
        } else if total_seconds < 3600 {
            format!("{}m", total_seconds / 60)
        } else if total_seconds < 86400 {
            format!("{}h", total_seconds / 3600)
        } else {
            format!("{}d", total_seconds / 86400)
        }
    }
}

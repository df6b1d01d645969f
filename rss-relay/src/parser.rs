use crate::types::{Feed, FeedEntry, RelayError, Result};
use feed_rs::parser;
use tracing::debug;

#[derive(Debug, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed(&self, content: &str) -> Result<Feed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| RelayError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let description = feed.description.map(|d| d.content);
        let link = feed.links.first().map(|l| l.href.clone());

        let entries: Vec<FeedEntry> = feed.entries.into_iter().map(Self::parse_entry).collect();

        debug!("Parsed feed with {} entries", entries.len());

        Ok(Feed {
            title,
            description,
            link,
            entries,
        })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> FeedEntry {
        let title = entry.title.map(|t| t.content).unwrap_or_default();
        let link = entry.links.first().map(|l| l.href.clone());

        // The RSS description carries the post body; fall back to the full content
        let raw_content = entry
            .summary
            .map(|s| s.content)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        let published_at = entry.published.or(entry.updated);

        FeedEntry {
            id: entry.id,
            title,
            link,
            raw_content,
            published_at,
        }
    }
}

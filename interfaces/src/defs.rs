use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// One parsed syndication feed. Entries are newest first by feed convention.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Feed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub entries: Vec<FeedEntry>,
}

impl Feed {
    pub fn newest(&self) -> Option<&FeedEntry> {
        self.entries.first()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedEntry {
    /// Feed-supplied unique token (RSS guid, Atom id). May be empty.
    pub id: String,
    pub title: String,
    pub link: Option<String>,
    /// Unsanitized markup of the entry body.
    pub raw_content: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaItem {
    pub source_url: String,
    pub resolved_id: Option<String>,
}

impl MediaItem {
    pub fn new(source_url: impl Into<String>) -> Self {
        MediaItem {
            source_url: source_url.into(),
            resolved_id: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Home,
    Followers,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Home => "home",
            Visibility::Followers => "followers",
        }
    }
}

/// Body of a note creation call, minus credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PostPayload {
    pub text: String,
    pub visibility: Visibility,
    #[serde(rename = "fileIds", skip_serializing_if = "Vec::is_empty")]
    pub media_ids: Vec<String>,
}

// Object style note:
// These are plain values handed between the fetcher, the pipeline and the
// remote API clients. They are built fresh on every tick and dropped at the end
// of it; nothing here is persisted.

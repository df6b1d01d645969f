//! Turns the HTML body of a feed entry into plain note text plus the media it
//! references.
//!
//! The work is an ordered list of [`NormalizeStage`]s. Order matters: the
//! ampersand entity must be unescaped before media URLs are harvested, and
//! tags can only be stripped once the media references have been read out of
//! them.

use crate::types::{MediaItem, RelayError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const DEFAULT_QUOTE_MARKER: &str = "**🔁 Quote:**";

const QUOTE_OPENING: &str = r#"<div class="rsshub-quote">"#;

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static MEDIA_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<(?:img|video)\b[^>]*?\ssrc="([^"]+)""#).unwrap());
static IMAGE_OR_PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b[^>]*>|</?p>").unwrap());
static ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<a\s[^>]*?href="([^"]+)"[^>]*>[^<]*</a>"#).unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Output of normalization: note text and media in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedContent {
    pub text: String,
    pub media: Vec<MediaItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeStage {
    /// `<br>` variants become `\n`.
    LineBreaks,
    /// `&amp;` becomes `&`.
    UnescapeAmpersand,
    /// The opening of an RSSHub quote block becomes a readable marker line.
    QuoteBlock { marker: String },
    /// Collects `src` of every `<img>` and `<video>` in document order.
    ExtractMedia,
    /// Anchors become their link target, every other tag is removed.
    StripTags,
}

impl NormalizeStage {
    pub fn name(&self) -> &'static str {
        match self {
            NormalizeStage::LineBreaks => "line-breaks",
            NormalizeStage::UnescapeAmpersand => "unescape-ampersand",
            NormalizeStage::QuoteBlock { .. } => "quote-block",
            NormalizeStage::ExtractMedia => "extract-media",
            NormalizeStage::StripTags => "strip-tags",
        }
    }

    pub fn apply(&self, content: &mut NormalizedContent) {
        match self {
            NormalizeStage::LineBreaks => {
                content.text = LINE_BREAK.replace_all(&content.text, "\n").into_owned();
            }
            NormalizeStage::UnescapeAmpersand => {
                content.text = unescape_ampersand(&content.text);
            }
            NormalizeStage::QuoteBlock { marker } => {
                content.text = content.text.replace(QUOTE_OPENING, &format!("\n{}", marker));
            }
            NormalizeStage::ExtractMedia => {
                content.media.extend(
                    MEDIA_SRC
                        .captures_iter(&content.text)
                        .map(|caps| MediaItem::new(unescape_ampersand(&caps[1]))),
                );
            }
            NormalizeStage::StripTags => {
                let text = IMAGE_OR_PARAGRAPH.replace_all(&content.text, "");
                let text = ANCHOR.replace_all(&text, |caps: &Captures| caps[1].to_string());
                content.text = ANY_TAG.replace_all(&text, "").into_owned();
            }
        }
    }
}

fn unescape_ampersand(s: &str) -> String {
    s.replace("&amp;", "&")
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    stages: Vec<NormalizeStage>,
}

impl Normalizer {
    /// The standard stage order. `quote_marker` of `None` disables the quote
    /// rewrite.
    pub fn new(quote_marker: Option<String>) -> Self {
        let mut stages = vec![NormalizeStage::LineBreaks, NormalizeStage::UnescapeAmpersand];
        if let Some(marker) = quote_marker {
            stages.push(NormalizeStage::QuoteBlock { marker });
        }
        stages.push(NormalizeStage::ExtractMedia);
        stages.push(NormalizeStage::StripTags);
        Self { stages }
    }

    /// Build from a custom stage list, rejecting orders that would mangle
    /// URLs or lose media.
    pub fn with_stages(stages: Vec<NormalizeStage>) -> Result<Self> {
        let position = |wanted: &NormalizeStage| stages.iter().position(|s| s == wanted);

        let extract = position(&NormalizeStage::ExtractMedia);
        if let (Some(unescape), Some(extract)) = (position(&NormalizeStage::UnescapeAmpersand), extract) {
            if extract < unescape {
                return Err(RelayError::Config(
                    "extract-media must run after unescape-ampersand".to_string(),
                ));
            }
        }
        if let Some(strip) = position(&NormalizeStage::StripTags) {
            if strip != stages.len() - 1 {
                return Err(RelayError::Config("strip-tags must be the last stage".to_string()));
            }
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[NormalizeStage] {
        &self.stages
    }

    pub fn normalize(&self, raw: &str) -> NormalizedContent {
        let mut content = NormalizedContent {
            text: raw.to_string(),
            media: Vec::new(),
        };
        for stage in &self.stages {
            stage.apply(&mut content);
        }
        content.text = content.text.trim().to_string();
        content
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Some(DEFAULT_QUOTE_MARKER.to_string()))
    }
}

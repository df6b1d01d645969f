use crate::traits::NoteApi;
use crate::types::{PostPayload, RelayError, Result, Visibility};
use std::sync::Arc;
use tracing::info;

/// Builds note payloads and hands them to the remote API.
pub struct Publisher {
    api: Arc<dyn NoteApi>,
    visibility: Visibility,
}

impl Publisher {
    pub fn new(api: Arc<dyn NoteApi>, visibility: Visibility) -> Self {
        Self { api, visibility }
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Create one note. Either the note exists with every id in `media_ids`
    /// attached, or the call fails and nothing was posted.
    pub async fn publish(&self, text: &str, media_ids: Vec<String>) -> Result<()> {
        if media_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(RelayError::Publish {
                status: 0,
                body: "refusing to attach an unresolved media id".to_string(),
            });
        }

        let payload = PostPayload {
            text: text.to_string(),
            visibility: self.visibility,
            media_ids,
        };

        self.api.create_note(&payload).await?;
        info!(
            "Created {} note ({} chars, {} media)",
            payload.visibility.as_str(),
            payload.text.chars().count(),
            payload.media_ids.len()
        );
        Ok(())
    }
}

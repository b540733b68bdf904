//! Listening activities in the `activities` collection.

use uuid::Uuid;

use crate::article::ReadingLevel;
use crate::document::{CollectionPath, DocumentWrite};
use crate::error::{ContentError, Result};
use crate::value::Fields;

pub const ACTIVITIES_COLLECTION: &str = "activities";
pub const LISTENING_ACTIVITY_TYPE: &str = "listening";

#[derive(Debug, Clone, Default)]
pub struct NewListeningActivity {
    pub audio_url: String,
    pub title: String,
    pub level: i64,
    pub transcript: String,
    pub tags: Vec<String>,
}

/// Database-style random key: 32 lowercase hex characters.
pub fn generate_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl NewListeningActivity {
    pub fn validate(&self) -> Result<ReadingLevel> {
        if self.audio_url.trim().is_empty() {
            return Err(ContentError::validation("audio URL must not be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(ContentError::validation("title must not be empty"));
        }
        ReadingLevel::new(self.level)
    }

    pub fn to_write(&self, id: &str) -> Result<DocumentWrite> {
        let level = self.validate()?;
        let path = CollectionPath::root(ACTIVITIES_COLLECTION).doc(id)?;

        let mut fields = Fields::new();
        fields.insert("activity_type".into(), LISTENING_ACTIVITY_TYPE.into());
        fields.insert("title".into(), self.title.clone().into());
        fields.insert("audioUrl".into(), self.audio_url.clone().into());
        fields.insert("level".into(), level.get().into());
        fields.insert("transcript".into(), self.transcript.clone().into());
        fields.insert("tags".into(), self.tags.clone().into());

        Ok(DocumentWrite::set(path, fields).with_server_timestamp("publishedAt"))
    }
}

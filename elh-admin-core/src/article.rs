//! Reading articles: validation and the document shape written to `articles`.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use crate::document::{CollectionPath, DocumentPath, DocumentWrite};
use crate::error::{ContentError, Result};
use crate::value::{Fields, Value};

pub const ARTICLES_COLLECTION: &str = "articles";

pub const MIN_READING_LEVEL: i64 = 1;
pub const MAX_READING_LEVEL: i64 = 18;

/// Fields set to the database's commit time on every article write.
pub const ARTICLE_SERVER_TIMESTAMPS: [&str; 3] = ["scrapedAt", "createdAt", "updatedAt"];

pub fn articles() -> CollectionPath {
    CollectionPath::root(ARTICLES_COLLECTION)
}

pub fn article_path(article_id: &str) -> Result<DocumentPath> {
    articles().doc(article_id)
}

/// Target grade-level difficulty, always within 1..=18.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReadingLevel(u8);

impl ReadingLevel {
    pub fn new(level: i64) -> Result<Self> {
        if !(MIN_READING_LEVEL..=MAX_READING_LEVEL).contains(&level) {
            return Err(ContentError::validation(format!(
                "level must be between {MIN_READING_LEVEL} and {MAX_READING_LEVEL} (inclusive), got {level}"
            )));
        }
        Ok(ReadingLevel(level as u8))
    }

    pub fn get(self) -> i64 {
        i64::from(self.0)
    }
}

impl TryFrom<i64> for ReadingLevel {
    type Error = ContentError;

    fn try_from(level: i64) -> Result<Self> {
        ReadingLevel::new(level)
    }
}

/// Splits a comma-separated list, trimming entries and dropping empties and
/// repeats (first occurrence wins).
pub fn parse_tags(raw: Option<&str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.unwrap_or_default().split(',').map(str::trim) {
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Parses `YYYY-MM-DD` into UTC midnight. Anything unparsable is logged and
/// dropped rather than failing the write.
pub fn parse_publication_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        Err(e) => {
            warn!(raw, error = %e, "Ignoring publication date not in YYYY-MM-DD format");
            None
        }
    }
}

/// Everything needed to write one article. `level` stays raw until
/// [`NewArticle::validate`] so out-of-range input is reported, not clamped.
#[derive(Debug, Clone, Default)]
pub struct NewArticle {
    pub id: String,
    pub title: String,
    pub content: String,
    pub level: i64,
    pub tags: Vec<String>,
    pub has_comprehension_questions: bool,
    pub source_url: String,
    pub source_name: String,
    pub author: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub summary_english: String,
    pub summary_traditional_chinese: String,
    pub estimated_reading_time_minutes: Option<i64>,
}

impl NewArticle {
    pub fn validate(&self) -> Result<ReadingLevel> {
        crate::document::validate_document_id(&self.id)?;
        if self.title.trim().is_empty() {
            return Err(ContentError::validation("title must not be empty"));
        }
        if let Some(minutes) = self.estimated_reading_time_minutes {
            if minutes < 0 {
                return Err(ContentError::validation(format!(
                    "estimated reading time must not be negative, got {minutes}"
                )));
            }
        }
        ReadingLevel::new(self.level)
    }

    pub fn to_fields(&self, level: ReadingLevel) -> Fields {
        let mut fields = Fields::new();
        fields.insert("title".into(), self.title.clone().into());
        fields.insert("content".into(), self.content.clone().into());
        fields.insert("level".into(), level.get().into());
        fields.insert("tags".into(), self.tags.clone().into());
        fields.insert(
            "hasComprehensionQuestions".into(),
            self.has_comprehension_questions.into(),
        );
        fields.insert("sourceUrl".into(), self.source_url.clone().into());
        fields.insert("sourceName".into(), self.source_name.clone().into());
        fields.insert("author".into(), self.author.clone().into());
        fields.insert("publicationDate".into(), self.publication_date.into());
        fields.insert("summaryEnglish".into(), self.summary_english.clone().into());
        fields.insert(
            "summaryTraditionalChinese".into(),
            self.summary_traditional_chinese.clone().into(),
        );
        fields.insert(
            "estimatedReadingTimeMinutes".into(),
            Value::from(self.estimated_reading_time_minutes),
        );
        fields
    }

    /// Validates and builds the full-document write keyed by `id`.
    pub fn to_write(&self) -> Result<DocumentWrite> {
        let level = self.validate()?;
        let path = article_path(&self.id)?;
        let write = ARTICLE_SERVER_TIMESTAMPS
            .iter()
            .fold(DocumentWrite::set(path, self.to_fields(level)), |w, f| {
                w.with_server_timestamp(f)
            });
        Ok(write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_bounds_are_inclusive() {
        assert!(ReadingLevel::new(1).is_ok());
        assert!(ReadingLevel::new(18).is_ok());
        assert!(ReadingLevel::new(0).is_err());
        assert!(ReadingLevel::new(19).is_err());
        assert!(ReadingLevel::new(-4).is_err());
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_tags(Some(" history, science,,history ,")),
            vec!["history".to_string(), "science".to_string()]
        );
        assert!(parse_tags(None).is_empty());
    }

    #[test]
    fn publication_date_is_utc_midnight_or_none() {
        let ts = parse_publication_date(Some("2023-11-05")).expect("valid date");
        assert_eq!(ts.to_rfc3339(), "2023-11-05T00:00:00+00:00");
        assert_eq!(parse_publication_date(Some("05/11/2023")), None);
        assert_eq!(parse_publication_date(Some("  ")), None);
    }
}

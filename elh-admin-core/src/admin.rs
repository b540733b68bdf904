//! Content operations behind each CLI subcommand.
//!
//! Every operation validates its input completely before touching the store
//! and then performs its reads/writes in order, returning on the first
//! failure. Nothing here prints: callers render the returned reports.
//!
//! # Operations
//! - [`check_connection`]: one-document read from `articles`
//! - [`add_article`]: full-document set keyed by the caller's ID
//! - [`list_article_questions`]: article title plus its ordered questions
//! - [`add_questions`]: atomic import of questions into an existing article
//! - [`add_listening_activity`]: new activity under a generated key

use std::path::Path;

use tracing::{error, info};

use crate::activity::{generate_document_id, NewListeningActivity};
use crate::article::{article_path, articles, NewArticle};
use crate::contract::DocumentStore;
use crate::document::DocumentWrite;
use crate::error::{ContentError, Result};
use crate::question::{validate_question_inputs, Question, QuestionInput, QUESTIONS_SUBCOLLECTION};
use crate::value::Fields;

/// What was written by a single-document command.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteReport {
    pub id: String,
    pub fields: Fields,
    /// Fields the database sets to its commit time.
    pub server_timestamps: Vec<String>,
}

impl From<&DocumentWrite> for WriteReport {
    fn from(write: &DocumentWrite) -> Self {
        WriteReport {
            id: write.path.id().to_string(),
            fields: write.fields.clone(),
            server_timestamps: write.server_timestamps.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleQuestions {
    pub article_id: String,
    pub title: String,
    pub questions: Vec<Question>,
}

/// Reads a file as UTF-8 text, reporting the path on failure.
pub fn read_text_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| {
        error!(path = %path.display(), error = %source, "Failed to read input file");
        ContentError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Performs a test read. Returns how many documents came back (0 or 1).
pub async fn check_connection<S>(store: &S) -> Result<usize>
where
    S: DocumentStore + ?Sized,
{
    info!("[CHECK] Reading one document from articles");
    match store.list_documents(&articles(), Some(1)).await {
        Ok(docs) => {
            info!(count = docs.len(), "[CHECK] Test read succeeded");
            Ok(docs.len())
        }
        Err(e) => {
            error!(error = %e, "[CHECK][ERROR] Test read failed");
            Err(ContentError::Store(e))
        }
    }
}

/// Writes one article document. An existing document with the same ID is
/// replaced.
pub async fn add_article<S>(store: &S, article: &NewArticle) -> Result<WriteReport>
where
    S: DocumentStore + ?Sized,
{
    let write = article.to_write()?;
    let report = WriteReport::from(&write);
    info!(article_id = %article.id, level = article.level, "[ARTICLE] Writing article");

    store.commit(vec![write]).await.map_err(|e| {
        error!(article_id = %article.id, error = %e, "[ARTICLE][ERROR] Write failed");
        ContentError::Store(e)
    })?;
    info!(article_id = %article.id, "[ARTICLE] Article written");
    Ok(report)
}

/// Loads an article and its questions ordered by `order` (then key).
pub async fn list_article_questions<S>(store: &S, article_id: &str) -> Result<ArticleQuestions>
where
    S: DocumentStore + ?Sized,
{
    let path = article_path(article_id)?;
    let article = store
        .get_document(&path)
        .await
        .map_err(ContentError::Store)?
        .ok_or_else(|| ContentError::NotFound(format!("Article '{article_id}' not found.")))?;

    let docs = store
        .list_documents(&path.subcollection(QUESTIONS_SUBCOLLECTION), None)
        .await
        .map_err(ContentError::Store)?;

    let mut questions: Vec<Question> = docs.iter().map(Question::from_document).collect();
    questions.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    info!(article_id, count = questions.len(), "[QUESTIONS] Loaded questions");

    Ok(ArticleQuestions {
        article_id: article_id.to_string(),
        title: article.get_str("title").unwrap_or_default().to_string(),
        questions,
    })
}

/// Imports questions into `articles/{id}/questions` as `mcq1..mcqN` and
/// flags the article, all in one commit. The article must already exist.
///
/// The import replaces the article's question set: stored questions whose
/// keys are not rewritten are deleted in the same commit.
pub async fn add_questions<S>(
    store: &S,
    article_id: &str,
    inputs: &[QuestionInput],
) -> Result<Vec<Question>>
where
    S: DocumentStore + ?Sized,
{
    validate_question_inputs(inputs)?;
    let path = article_path(article_id)?;

    if store
        .get_document(&path)
        .await
        .map_err(ContentError::Store)?
        .is_none()
    {
        return Err(ContentError::NotFound(format!("Article '{article_id}' not found.")));
    }

    let questions: Vec<Question> = inputs
        .iter()
        .zip(1i64..)
        .map(|(input, order)| Question::from_input(input, order))
        .collect();

    let subcollection = path.subcollection(QUESTIONS_SUBCOLLECTION);
    let existing = store
        .list_documents(&subcollection, None)
        .await
        .map_err(ContentError::Store)?;
    let stale: Vec<&str> = existing
        .iter()
        .map(|doc| doc.id.as_str())
        .filter(|id| !questions.iter().any(|q| q.id == *id))
        .collect();

    let mut writes = Vec::with_capacity(questions.len() + stale.len() + 1);
    for q in &questions {
        writes.push(DocumentWrite::set(subcollection.doc(&q.id)?, q.to_fields()));
    }
    for id in &stale {
        writes.push(DocumentWrite::delete(subcollection.doc(id)?));
    }
    let mut flag = Fields::new();
    flag.insert("hasComprehensionQuestions".into(), true.into());
    writes.push(DocumentWrite::merge(path, flag).with_server_timestamp("updatedAt"));

    info!(
        article_id,
        count = questions.len(),
        removed = stale.len(),
        "[QUESTIONS] Committing questions"
    );
    store.commit(writes).await.map_err(|e| {
        error!(article_id, error = %e, "[QUESTIONS][ERROR] Commit failed");
        ContentError::Store(e)
    })?;
    Ok(questions)
}

/// Writes a listening activity under a freshly generated key.
pub async fn add_listening_activity<S>(
    store: &S,
    activity: &NewListeningActivity,
) -> Result<WriteReport>
where
    S: DocumentStore + ?Sized,
{
    let write = activity.to_write(&generate_document_id())?;
    let report = WriteReport::from(&write);
    info!(activity_id = %report.id, "[ACTIVITY] Writing listening activity");

    store.commit(vec![write]).await.map_err(|e| {
        error!(activity_id = %report.id, error = %e, "[ACTIVITY][ERROR] Write failed");
        ContentError::Store(e)
    })?;
    Ok(report)
}

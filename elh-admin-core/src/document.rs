//! Addressing and write descriptions for documents.
//!
//! Paths are relative to the database root (`articles/a1`,
//! `articles/a1/questions/mcq1`). The store client is responsible for
//! prefixing them with `projects/{p}/databases/{d}/documents`.

use std::fmt;

use crate::error::{ContentError, Result};
use crate::value::Fields;

/// Path to a collection: an odd number of segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPath(String);

/// Path to a document: a collection path plus a document key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: String,
}

impl CollectionPath {
    /// A top-level collection such as `articles`.
    pub fn root(name: &str) -> Self {
        CollectionPath(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address a document in this collection, rejecting keys the database
    /// would refuse or interpret as a nested path.
    pub fn doc(&self, id: &str) -> Result<DocumentPath> {
        validate_document_id(id)?;
        Ok(DocumentPath {
            collection: self.clone(),
            id: id.to_string(),
        })
    }
}

impl DocumentPath {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn subcollection(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{}/{}/{}", self.collection.0, self.id, name))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Checks a caller-supplied document key.
pub fn validate_document_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ContentError::validation("document ID must not be empty"));
    }
    if id.contains('/') {
        return Err(ContentError::validation(format!(
            "document ID '{id}' must not contain '/'"
        )));
    }
    if id == "." || id == ".." {
        return Err(ContentError::validation(format!(
            "document ID '{id}' is reserved"
        )));
    }
    if id.len() > 2 && id.starts_with("__") && id.ends_with("__") {
        return Err(ContentError::validation(format!(
            "document ID '{id}' matches the reserved __.*__ pattern"
        )));
    }
    if id.len() > 1500 {
        return Err(ContentError::validation("document ID exceeds 1500 bytes"));
    }
    Ok(())
}

/// A document as read back from the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// The document key (last path segment).
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the whole document, creating it if absent.
    Set,
    /// Update only the listed fields of an existing document.
    Merge,
    /// Remove the document. A missing document is not an error.
    Delete,
}

/// One write inside an atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    pub path: DocumentPath,
    pub fields: Fields,
    /// Fields the database fills with its own commit time.
    pub server_timestamps: Vec<String>,
    pub mode: WriteMode,
}

impl DocumentWrite {
    pub fn set(path: DocumentPath, fields: Fields) -> Self {
        DocumentWrite {
            path,
            fields,
            server_timestamps: Vec::new(),
            mode: WriteMode::Set,
        }
    }

    pub fn merge(path: DocumentPath, fields: Fields) -> Self {
        DocumentWrite {
            mode: WriteMode::Merge,
            ..DocumentWrite::set(path, fields)
        }
    }

    pub fn delete(path: DocumentPath) -> Self {
        DocumentWrite {
            mode: WriteMode::Delete,
            ..DocumentWrite::set(path, Fields::new())
        }
    }

    pub fn with_server_timestamp(mut self, field: &str) -> Self {
        self.server_timestamps.push(field.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_paths_render_as_slash_joined_segments() {
        let article = CollectionPath::root("articles").doc("a1").unwrap();
        let question = article.subcollection("questions").doc("mcq1").unwrap();
        assert_eq!(question.to_string(), "articles/a1/questions/mcq1");
        assert_eq!(question.collection().as_str(), "articles/a1/questions");
    }

    #[test]
    fn delete_write_carries_no_fields() {
        let path = CollectionPath::root("articles").doc("a1").unwrap();
        let write = DocumentWrite::delete(path);
        assert_eq!(write.mode, WriteMode::Delete);
        assert!(write.fields.is_empty());
        assert!(write.server_timestamps.is_empty());
    }

    #[test]
    fn rejects_keys_that_would_change_the_path() {
        let articles = CollectionPath::root("articles");
        assert!(articles.doc("").is_err());
        assert!(articles.doc("a/b").is_err());
        assert!(articles.doc("..").is_err());
        assert!(articles.doc("__meta__").is_err());
        assert!(articles.doc("intro-to-tides").is_ok());
    }
}

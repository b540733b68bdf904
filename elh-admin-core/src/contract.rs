//! # contract: interface to the document database
//!
//! [`DocumentStore`] is the only seam between content operations and the
//! database. The CLI crate implements it over the Firestore REST API; tests
//! use the `mockall`-generated `MockDocumentStore`.
//!
//! Implementors convert every transport or API failure into a boxed
//! [`StoreError`]. No method retries.

use async_trait::async_trait;

#[allow(unused_imports)]
use mockall::{automock, predicate::*};

use crate::document::{CollectionPath, Document, DocumentPath, DocumentWrite};

/// Error type for store calls (simple boxed error, like every client error).
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Reads and writes documents in a managed document database.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document. `Ok(None)` when it does not exist.
    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError>;

    /// List documents of a collection.
    ///
    /// With `page_size = Some(n)` only the first page of at most `n`
    /// documents is returned; with `None` every page is fetched.
    async fn list_documents(
        &self,
        collection: &CollectionPath,
        page_size: Option<u32>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Apply all writes in a single atomic commit.
    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError>;
}

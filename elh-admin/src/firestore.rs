#![doc = "Firestore REST client: implements the core `DocumentStore` contract over HTTPS (or plain HTTP to the emulator)."]
//
//! # Firestore client (CLI <-> database)
//!
//! [`FirestoreClient`] is the production [`DocumentStore`]. It speaks the
//! Firestore v1 REST API directly with `reqwest`:
//!
//! - `GET  {root}/documents/{path}` for single reads (404 means absent)
//! - `GET  {root}/documents/{collection}?pageSize=&pageToken=` for listings
//! - `POST {root}/documents:commit` for atomic writes
//!
//! where `{root}` is `projects/{project}/databases/{database}`. Every path
//! segment is percent-encoded, so keys containing `?`, `#` or `%` address
//! exactly one document. Field values are converted with
//! `elh_admin_core::value`. Authentication is delegated to [`TokenSource`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use elh_admin_core::contract::{DocumentStore, StoreError};
use elh_admin_core::credentials::ServiceAccountKey;
use elh_admin_core::document::{CollectionPath, Document, DocumentPath, DocumentWrite, WriteMode};
use elh_admin_core::value::{decode_fields, encode_fields};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde_json::{json, Value as Json};

use crate::auth::TokenSource;
use crate::load_config::Settings;

pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
/// Page size used when a listing must fetch every document.
const FULL_LISTING_PAGE_SIZE: u32 = 300;

pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: Url,
    database_root: String,
    tokens: TokenSource,
}

impl fmt::Debug for FirestoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirestoreClient")
            .field("base_url", &self.base_url.as_str())
            .field("database_root", &self.database_root)
            .finish_non_exhaustive()
    }
}

impl FirestoreClient {
    /// Builds a client for the key's project (or the configured override).
    /// Performs no network I/O.
    pub fn new(key: &ServiceAccountKey, settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        let project_id = settings.project_id.as_deref().unwrap_or(&key.project_id);
        let database_root = format!("projects/{}/databases/{}", project_id, settings.database_id);

        let (endpoint, tokens) = match settings.emulator_host.as_deref() {
            Some(host) => {
                tracing::warn!(emulator_host = host, "Using Firestore emulator");
                (format!("http://{}/v1", host.trim_end_matches('/')), TokenSource::emulator())
            }
            None => (
                FIRESTORE_BASE_URL.to_string(),
                TokenSource::from_service_account(key, http.clone())?,
            ),
        };
        let base_url = Url::parse(&endpoint)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| anyhow::anyhow!("Invalid Firestore endpoint: {endpoint}"))?;

        tracing::info!(
            project_id,
            database_id = %settings.database_id,
            base_url = %base_url,
            "Initialized FirestoreClient"
        );
        Ok(FirestoreClient {
            http,
            base_url,
            database_root,
            tokens,
        })
    }

    pub fn database_root(&self) -> &str {
        &self.database_root
    }

    /// `{base}/{root}/{segments..}` with each segment percent-encoded.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| format!("Firestore endpoint {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(self.database_root.split('/'))
            .extend(segments);
        Ok(url)
    }

    /// URL of a document or collection under `documents/`. Document keys never
    /// contain `/`, so splitting the relative path recovers its segments.
    pub(crate) fn documents_url(&self, relative: &str) -> Result<Url, StoreError> {
        self.endpoint(std::iter::once("documents").chain(relative.split('/')))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, StoreError> {
        let token = self.tokens.token().await?;
        let response = request.bearer_auth(token).send().await.map_err(|e| {
            tracing::error!(error = %e, operation = what, "Firestore request failed to send");
            format!("Firestore {what} request failed: {e}")
        })?;
        Ok(response)
    }
}

/// Turns a non-success response into an error carrying the API's message.
async fn api_error(response: Response, what: &str) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = api_error_message(&body).unwrap_or(body);
    tracing::error!(%status, operation = what, message = %message, "Firestore API error");
    format!("Firestore {what} failed ({status}): {message}").into()
}

/// Extracts `error.message` (and `error.status`) from a Google API error body.
fn api_error_message(body: &str) -> Option<String> {
    let parsed: Json = serde_json::from_str(body).ok()?;
    let error = parsed.get("error")?;
    let message = error.get("message")?.as_str()?;
    Some(match error.get("status").and_then(Json::as_str) {
        Some(status) => format!("{status}: {message}"),
        None => message.to_string(),
    })
}

/// Field paths that are not plain identifiers must be backtick-quoted.
fn quote_field_path(field: &str) -> String {
    let mut chars = field.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        field.to_string()
    } else {
        format!("`{}`", field.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Encodes one write for the `documents:commit` body.
pub(crate) fn encode_write(database_root: &str, write: &DocumentWrite) -> Json {
    let name = format!("{}/documents/{}", database_root, write.path);
    if write.mode == WriteMode::Delete {
        return json!({ "delete": name });
    }
    let mut encoded = json!({
        "update": { "name": name, "fields": encode_fields(&write.fields) }
    });
    if write.mode == WriteMode::Merge {
        let paths: Vec<String> = write.fields.keys().map(|f| quote_field_path(f)).collect();
        encoded["updateMask"] = json!({ "fieldPaths": paths });
        encoded["currentDocument"] = json!({ "exists": true });
    }
    if !write.server_timestamps.is_empty() {
        let transforms: Vec<Json> = write
            .server_timestamps
            .iter()
            .map(|f| json!({ "fieldPath": quote_field_path(f), "setToServerValue": "REQUEST_TIME" }))
            .collect();
        encoded["updateTransforms"] = Json::Array(transforms);
    }
    encoded
}

/// Decodes a REST `Document` resource.
pub(crate) fn decode_document(raw: &Json) -> Result<Document, StoreError> {
    let name = raw
        .get("name")
        .and_then(Json::as_str)
        .ok_or("document resource without a name")?;
    let id = name.rsplit('/').next().unwrap_or(name).to_string();
    let fields = decode_fields(raw.get("fields").unwrap_or(&Json::Null))?;
    Ok(Document { id, fields })
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        tracing::info!(path = %path, "Fetching document");
        let url = self.documents_url(&path.to_string())?;
        let response = self.send(self.http.get(url), "get").await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::info!(path = %path, "Document does not exist");
                Ok(None)
            }
            s if s.is_success() => {
                let raw: Json = response
                    .json()
                    .await
                    .map_err(|e| format!("malformed document response: {e}"))?;
                Ok(Some(decode_document(&raw)?))
            }
            _ => Err(api_error(response, "get").await),
        }
    }

    async fn list_documents(
        &self,
        collection: &CollectionPath,
        page_size: Option<u32>,
    ) -> Result<Vec<Document>, StoreError> {
        tracing::info!(collection = %collection, ?page_size, "Listing documents");
        let url = self.documents_url(collection.as_str())?;
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let size = page_size.unwrap_or(FULL_LISTING_PAGE_SIZE).to_string();
            let mut query = vec![("pageSize", size)];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            let response = self.send(self.http.get(url.clone()).query(&query), "list").await?;
            if !response.status().is_success() {
                return Err(api_error(response, "list").await);
            }
            let raw: Json = response
                .json()
                .await
                .map_err(|e| format!("malformed list response: {e}"))?;

            if let Some(items) = raw.get("documents").and_then(Json::as_array) {
                for item in items {
                    documents.push(decode_document(item)?);
                }
            }
            page_token = raw
                .get("nextPageToken")
                .and_then(Json::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);

            if page_size.is_some() || page_token.is_none() {
                break;
            }
        }

        tracing::info!(collection = %collection, count = documents.len(), "Listed documents");
        Ok(documents)
    }

    async fn commit(&self, writes: Vec<DocumentWrite>) -> Result<(), StoreError> {
        tracing::info!(writes = writes.len(), "Committing writes");
        let url = self.endpoint(["documents:commit"])?;
        let body = json!({
            "writes": writes
                .iter()
                .map(|w| encode_write(&self.database_root, w))
                .collect::<Vec<_>>()
        });
        let response = self.send(self.http.post(url).json(&body), "commit").await?;
        if !response.status().is_success() {
            return Err(api_error(response, "commit").await);
        }
        tracing::info!(writes = writes.len(), "Commit succeeded");
        Ok(())
    }
}

//! Process-wide Firestore client, built once and shared.
//!
//! The factory is owned by the CLI run and handed out explicitly; there is
//! no global. The first [`ClientFactory::client`] call reads the key and
//! builds the client; later calls return the same `Arc`. A failed build is
//! not retried within the same process.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use elh_admin_core::credentials::ServiceAccountKey;
use tokio::sync::OnceCell;

use crate::firestore::FirestoreClient;
use crate::load_config::Settings;

pub struct ClientFactory {
    settings: Settings,
    client: OnceCell<Arc<FirestoreClient>>,
}

impl ClientFactory {
    pub fn new(settings: Settings) -> Self {
        ClientFactory {
            settings,
            client: OnceCell::new(),
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.client.initialized()
    }

    pub async fn client(&self, key_path: &Path) -> Result<Arc<FirestoreClient>> {
        let client = self
            .client
            .get_or_try_init(|| async {
                tracing::info!(key_path = %key_path.display(), "Initialising Firestore client");
                let key = ServiceAccountKey::from_file(key_path)?;
                let client = FirestoreClient::new(&key, &self.settings).with_context(|| {
                    format!(
                        "Error initializing Firebase with key file {}",
                        key_path.display()
                    )
                })?;
                Ok::<_, anyhow::Error>(Arc::new(client))
            })
            .await?;
        Ok(Arc::clone(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::write;
    use tempfile::NamedTempFile;

    fn emulator_settings() -> Settings {
        Settings {
            emulator_host: Some("127.0.0.1:9".into()),
            ..Settings::default()
        }
    }

    fn key_file() -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        write(
            file.path(),
            r#"{"project_id":"elh-test","client_email":"a@elh-test.iam","private_key":"unused"}"#,
        )
        .unwrap();
        file
    }

    #[tokio::test]
    async fn second_call_returns_the_cached_handle() {
        let factory = ClientFactory::new(emulator_settings());
        let key = key_file();
        assert!(!factory.is_initialised());

        let first = factory.client(key.path()).await.unwrap();
        let second = factory.client(key.path()).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(factory.is_initialised());
        assert_eq!(first.database_root(), "projects/elh-test/databases/(default)");
    }

    #[tokio::test]
    async fn invalid_key_file_fails_initialisation() {
        let factory = ClientFactory::new(emulator_settings());
        let file = NamedTempFile::new().unwrap();
        write(file.path(), "{ not json").unwrap();

        let err = factory.client(file.path()).await.unwrap_err();
        assert!(format!("{err:#}").contains("valid JSON key file"));
        assert!(!factory.is_initialised());
    }

    #[tokio::test]
    async fn bad_private_key_fails_without_emulator() {
        let factory = ClientFactory::new(Settings::default());
        let key = key_file();
        let err = factory.client(key.path()).await.unwrap_err();
        assert!(format!("{err:#}").contains("RSA PEM"));
    }
}

/// `load_config` module: optional YAML settings for the Firestore connection.
///
/// Nothing secret lives in this file; the service-account key is located
/// separately (see `elh_admin_core::credentials`). Without `--config` every
/// setting takes its default.
///
/// ```yaml
/// project_id: elh-prod          # overrides the key file's project
/// database_id: "(default)"
/// emulator_host: localhost:8080 # talk to the local emulator instead
/// request_timeout_secs: 30
/// ```
///
/// `emulator_host` falls back to `FIRESTORE_EMULATOR_HOST` when the file does
/// not set it.
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const EMULATOR_HOST_ENV_VAR: &str = "FIRESTORE_EMULATOR_HOST";
pub const DEFAULT_DATABASE_ID: &str = "(default)";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub project_id: Option<String>,
    pub database_id: String,
    pub emulator_host: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            project_id: None,
            database_id: DEFAULT_DATABASE_ID.to_string(),
            emulator_host: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Loads settings from `path` (if any) and applies environment fallbacks.
pub fn load_config(path: Option<&Path>) -> Result<Settings> {
    let mut settings = match path {
        None => {
            info!("No config file given, using default settings");
            Settings::default()
        }
        Some(path_ref) => {
            info!(config_path = ?path_ref, "Loading configuration from file");
            let config_content = match fs::read_to_string(path_ref) {
                Ok(content) => content,
                Err(e) => {
                    error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
                    return Err(anyhow::anyhow!(
                        "Failed to read config file {:?}: {}",
                        path_ref,
                        e
                    ));
                }
            };
            match serde_yaml::from_str::<Option<Settings>>(&config_content) {
                Ok(conf) => {
                    info!(config_path = ?path_ref, "Parsed config YAML successfully");
                    conf.unwrap_or_default()
                }
                Err(e) => {
                    error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                    return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
                }
            }
        }
    };

    if settings.emulator_host.is_none() {
        settings.emulator_host = std::env::var(EMULATOR_HOST_ENV_VAR)
            .ok()
            .filter(|h| !h.trim().is_empty());
    }
    if settings.database_id.trim().is_empty() {
        anyhow::bail!("database_id must not be empty");
    }
    if settings.request_timeout_secs == 0 {
        anyhow::bail!("request_timeout_secs must be greater than zero");
    }

    info!(
        database_id = %settings.database_id,
        emulator = settings.emulator_host.is_some(),
        timeout_secs = settings.request_timeout_secs,
        "Settings loaded"
    );
    Ok(settings)
}

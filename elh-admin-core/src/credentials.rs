//! Service-account credential lookup.
//!
//! The key path comes from `--key-path` or, failing that, from
//! [`SERVICE_ACCOUNT_KEY_ENV_VAR`]. Resolution is a one-shot startup check:
//! it either yields an existing file or an error describing how to fix it.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};

pub const SERVICE_ACCOUNT_KEY_ENV_VAR: &str = "FIREBASE_SERVICE_ACCOUNT_KEY_PATH";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error(
        "Firebase service account key path is required. \
         Set the {env_var} environment variable or provide the --key-path argument."
    )]
    Missing { env_var: String },

    #[error("Service account key file not found at path: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read service account key file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid service account key file {}. Is it a valid JSON key file? Details: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Service account key file {} has an empty `{field}` field", .path.display())]
    EmptyField { path: PathBuf, field: &'static str },
}

/// Picks the credential file: explicit path first, then `env_var`.
/// Empty values count as absent.
pub fn resolve_key_path(
    explicit: Option<&Path>,
    env_var: &str,
) -> Result<PathBuf, CredentialError> {
    let from_flag = explicit
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf);
    let from_env = || {
        std::env::var_os(env_var)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    };

    let path = match from_flag {
        Some(p) => {
            debug!(key_path = %p.display(), "Using key path from --key-path");
            p
        }
        None => match from_env() {
            Some(p) => {
                debug!(key_path = %p.display(), env_var, "Using key path from environment");
                p
            }
            None => {
                error!(env_var, "No service account key path supplied");
                return Err(CredentialError::Missing {
                    env_var: env_var.to_string(),
                });
            }
        },
    };

    if !path.is_file() {
        error!(key_path = %path.display(), "Service account key file does not exist");
        return Err(CredentialError::NotFound(path));
    }
    info!(key_path = %path.display(), "Resolved service account key path");
    Ok(path)
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The fields of a Google service-account JSON key this tool needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CredentialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw, path)
    }

    /// `origin` is only used in error messages.
    pub fn from_json_str(raw: &str, origin: &Path) -> Result<Self, CredentialError> {
        let key: ServiceAccountKey =
            serde_json::from_str(raw).map_err(|source| CredentialError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        for (field, value) in [
            ("project_id", &key.project_id),
            ("client_email", &key.client_email),
            ("private_key", &key.private_key),
        ] {
            if value.trim().is_empty() {
                return Err(CredentialError::EmptyField {
                    path: origin.to_path_buf(),
                    field,
                });
            }
        }
        Ok(key)
    }
}

// Keep the private key out of logs.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

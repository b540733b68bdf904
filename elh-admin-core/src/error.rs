use std::path::PathBuf;

use thiserror::Error;

use crate::contract::StoreError;
use crate::value::ValueError;

/// Failure of a content operation. Every variant is terminal for the command.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed document data: {0}")]
    Decode(#[from] ValueError),

    #[error("Database error: {0}")]
    Store(#[source] StoreError),
}

impl ContentError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ContentError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;

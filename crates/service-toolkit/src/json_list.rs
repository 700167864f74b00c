//! Loading JSON array files into typed lists.
//!
//! The file must hold a single JSON array whose elements deserialize into
//! `T`. A file containing just `null` is reported as [`JsonListError::Empty`]
//! rather than as an empty list.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
#[path = "json_list_tests.rs"]
mod tests;

/// Errors from loading a JSON list
#[derive(Debug, Error)]
pub enum JsonListError {
    #[error("Invalid argument '{field}': {message}")]
    InvalidArgument { field: String, message: String },

    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Error reading file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deserialize JSON from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Deserialized list from {path} is null")]
    Empty { path: PathBuf },
}

/// Read `path` and decode it as a list of `T`
pub fn deserialize_list<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<Vec<T>, JsonListError> {
    let path = path.as_ref();

    if path.as_os_str().is_empty() {
        return Err(JsonListError::InvalidArgument {
            field: "path".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    if !path.exists() {
        return Err(JsonListError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| JsonListError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded: Option<Vec<T>> =
        serde_json::from_str(&content).map_err(|source| JsonListError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let items = decoded.ok_or_else(|| JsonListError::Empty {
        path: path.to_path_buf(),
    })?;

    debug!(path = %path.display(), count = items.len(), "JSON list loaded");
    Ok(items)
}

/// Reusable reader for JSON list files under an optional base directory
#[derive(Debug, Clone, Default)]
pub struct JsonListReader {
    base_dir: Option<PathBuf>,
}

impl JsonListReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base_dir`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Decode the list stored at `path`
    pub fn read<T: DeserializeOwned>(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<T>, JsonListError> {
        let path = path.as_ref();

        match self.base_dir {
            Some(ref base) if !path.as_os_str().is_empty() && path.is_relative() => {
                deserialize_list(base.join(path))
            }
            _ => deserialize_list(path),
        }
    }
}

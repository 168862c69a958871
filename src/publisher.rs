//! Artifact naming, local serialization and upload.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::ml::{FittedPipeline, TrainError};
use crate::storage::{ObjectStore, StorageError, StoredObject};

/// Object prefix for every published model.
pub const ARTIFACT_PREFIX: &str = "trained_models/";
/// Base name before the timestamp.
pub const ARTIFACT_BASE_NAME: &str = "breast_cancer_model_";
/// File extension kept for compatibility with existing bucket consumers.
pub const ARTIFACT_EXTENSION: &str = "joblib";

const KEY_TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to format artifact timestamp: {0}")]
    FormatTime(#[from] time::error::Format),
    #[error("Model JSON error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(#[from] TrainError),
}

/// How the local copy of the artifact is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub local_path: PathBuf,
    /// Leave the local file in place after a successful upload.
    pub keep_local: bool,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub local_path: PathBuf,
    /// Whether the local file still exists after publishing.
    pub local_kept: bool,
    pub stored: StoredObject,
}

/// Object key for an artifact produced at `now` (converted to UTC).
pub fn artifact_key(now: OffsetDateTime) -> Result<String, PublishError> {
    let timestamp = now
        .to_offset(time::UtcOffset::UTC)
        .format(KEY_TIMESTAMP_FORMAT)?;
    Ok(format!(
        "{ARTIFACT_PREFIX}{ARTIFACT_BASE_NAME}{timestamp}.{ARTIFACT_EXTENSION}"
    ))
}

/// Write the fitted pipeline to `path`, replacing any previous file.
pub fn save_model(path: &Path, model: &FittedPipeline) -> Result<(), PublishError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PublishError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let bytes = serde_json::to_vec(model)?;
    fs::write(path, bytes).map_err(|source| PublishError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a previously saved pipeline back from `path`.
pub fn load_model(path: &Path) -> Result<FittedPipeline, PublishError> {
    let bytes = fs::read(path).map_err(|source| PublishError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let model: FittedPipeline = serde_json::from_slice(&bytes)?;
    model.validate()?;
    Ok(model)
}

/// Save `model` locally, then upload the file's bytes to `store` under `key`.
pub fn save_model_to_store(
    model: &FittedPipeline,
    store: &dyn ObjectStore,
    key: &str,
    options: &PublishOptions,
) -> Result<PublishedArtifact, PublishError> {
    let path = options.local_path.as_path();
    save_model(path, model)?;
    println!("Saved model locally to {}", path.display());
    tracing::info!(path = %path.display(), "Saved model artifact");

    let bytes = fs::read(path).map_err(|source| PublishError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let stored = store.store(&bytes, key)?;
    println!("Uploaded model to {}", stored.location);
    tracing::info!(location = %stored.location, size = stored.size, "Uploaded model artifact");

    if !options.keep_local {
        fs::remove_file(path).map_err(|source| PublishError::Remove {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Removed local artifact");
    }

    Ok(PublishedArtifact {
        local_path: path.to_path_buf(),
        local_kept: options.keep_local,
        stored,
    })
}

//! End-to-end training run: load, train, name, publish.

use time::OffsetDateTime;

use crate::config::{ConfigError, JobConfig};
use crate::dataset::{DatasetLoadError, load_data};
use crate::ml::TrainError;
use crate::publisher::{PublishError, PublishOptions, PublishedArtifact, artifact_key, save_model_to_store};
use crate::storage::{ObjectStore, StorageError};
use crate::trainer::train_model;

/// Any failure of a run. Each stage's message surfaces unchanged.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dataset(#[from] DatasetLoadError),
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub accuracy: f64,
    pub key: String,
    pub artifact: PublishedArtifact,
}

/// Run the whole job against `store`, naming the artifact after `now`.
pub fn run_job(
    config: &JobConfig,
    store: &dyn ObjectStore,
    now: OffsetDateTime,
) -> Result<JobSummary, JobError> {
    let (x, y) = load_data()?;
    let outcome = train_model(&x, &y, &config.train)?;

    let key = artifact_key(now)?;
    tracing::info!(bucket = %config.bucket, key = %key, "Publishing model artifact");
    let options = PublishOptions {
        local_path: config.local_path.clone(),
        keep_local: config.keep_local,
    };
    let artifact = save_model_to_store(&outcome.model, store, &key, &options)?;

    Ok(JobSummary {
        accuracy: outcome.accuracy,
        key,
        artifact,
    })
}

/// Resolve configuration through `lookup`, open the store, then run.
///
/// Configuration is read before the store is built or any training starts, so
/// a missing bucket fails fast without touching storage.
pub fn run_from_lookup<F, S, M>(
    lookup: F,
    make_store: M,
    now: OffsetDateTime,
) -> Result<JobSummary, JobError>
where
    F: Fn(&str) -> Option<String>,
    S: ObjectStore,
    M: FnOnce(&JobConfig) -> Result<S, StorageError>,
{
    let config = JobConfig::from_lookup(lookup)?;
    let store = make_store(&config)?;
    run_job(&config, &store, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use tempfile::tempdir;
    use time::macros::datetime;

    #[test]
    fn run_publishes_one_timestamped_object() {
        let dir = tempdir().unwrap();
        let mut config = JobConfig::new("models");
        config.local_path = dir.path().join("model.joblib");
        let store = MemoryStore::new("models");

        let summary = run_job(&config, &store, datetime!(2025-01-02 03:04:05 UTC)).unwrap();

        assert_eq!(
            summary.key,
            "trained_models/breast_cancer_model_20250102030405.joblib"
        );
        assert_eq!(store.keys(), vec![summary.key.clone()]);
        assert_eq!(
            summary.artifact.stored.location,
            "mem://models/trained_models/breast_cancer_model_20250102030405.joblib"
        );
        assert!((0.0..=1.0).contains(&summary.accuracy));
        assert!(config.local_path.exists());
    }

    #[test]
    fn missing_bucket_stops_before_the_store_is_opened() {
        let store = MemoryStore::new("models");
        let mut opened = false;
        let err = run_from_lookup(
            |_: &str| None,
            |_| {
                opened = true;
                Ok(&store)
            },
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert!(matches!(err, JobError::Config(ConfigError::MissingBucket)));
        assert!(!opened);
        assert!(store.is_empty());
    }

    #[test]
    fn store_construction_errors_fail_the_run() {
        let err = run_from_lookup(
            |name: &str| (name == "GCS_MODEL_BUCKET").then(|| "models".to_string()),
            |_| Err::<MemoryStore, _>(StorageError::EmptyBucket),
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert!(matches!(err, JobError::Storage(StorageError::EmptyBucket)));
    }

    #[test]
    fn storage_errors_surface_unchanged() {
        let dir = tempdir().unwrap();
        let mut config = JobConfig::new("models");
        config.local_path = dir.path().join("model.joblib");
        let store = MemoryStore::failing("models", "permission denied for bucket");

        let err = run_job(&config, &store, OffsetDateTime::now_utc()).unwrap_err();
        assert!(matches!(err, JobError::Publish(PublishError::Storage(_))));
        assert_eq!(err.to_string(), "HTTP error: permission denied for bucket");
    }
}

//! Job configuration resolved once at the process edge.
//!
//! Everything the run needs from the environment is read here into a
//! [`JobConfig`] value; the rest of the crate only sees that value.

use std::path::PathBuf;

use thiserror::Error;

use crate::trainer::TrainOptions;

/// Required: destination bucket for the model artifact.
pub const BUCKET_ENV: &str = "GCS_MODEL_BUCKET";
/// Optional: local artifact path (default `model.joblib`).
pub const LOCAL_PATH_ENV: &str = "MODEL_LOCAL_PATH";
/// Optional: keep the local artifact after upload (default `true`).
pub const KEEP_LOCAL_ENV: &str = "MODEL_KEEP_LOCAL";
/// Optional: holdout fraction (default `0.2`).
pub const TEST_FRACTION_ENV: &str = "TRAIN_TEST_FRACTION";
/// Optional: split seed (default `42`).
pub const SEED_ENV: &str = "TRAIN_SEED";
/// Optional: alternate GCS API root, e.g. a local emulator.
pub const ENDPOINT_ENV: &str = "GCS_ENDPOINT";
/// Optional: bearer token; without it the metadata server is asked.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Default local path of the serialized pipeline.
pub const DEFAULT_LOCAL_PATH: &str = "model.joblib";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "Environment variable GCS_MODEL_BUCKET is not set. Set it in your GitHub Actions workflow or local env."
    )]
    MissingBucket,
    #[error("Invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything a single training run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct JobConfig {
    pub bucket: String,
    pub local_path: PathBuf,
    /// Leave the local artifact in place after a successful upload.
    pub keep_local: bool,
    pub train: TrainOptions,
    pub endpoint: Option<String>,
    pub access_token: Option<String>,
}

impl JobConfig {
    /// Config with defaults for everything except the bucket.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            local_path: PathBuf::from(DEFAULT_LOCAL_PATH),
            keep_local: true,
            train: TrainOptions::default(),
            endpoint: None,
            access_token: None,
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bucket = value(BUCKET_ENV).ok_or(ConfigError::MissingBucket)?;
        let mut config = Self::new(bucket);
        if let Some(path) = value(LOCAL_PATH_ENV) {
            config.local_path = PathBuf::from(path);
        }
        if let Some(raw) = value(KEEP_LOCAL_ENV) {
            config.keep_local = parse_bool(KEEP_LOCAL_ENV, &raw)?;
        }
        if let Some(raw) = value(TEST_FRACTION_ENV) {
            let fraction = raw.parse::<f64>().map_err(|err| invalid(TEST_FRACTION_ENV, &raw, err))?;
            if !(fraction > 0.0 && fraction < 1.0) {
                return Err(invalid(TEST_FRACTION_ENV, &raw, "must be between 0 and 1"));
            }
            config.train.test_fraction = fraction;
        }
        if let Some(raw) = value(SEED_ENV) {
            config.train.seed = raw.parse::<u64>().map_err(|err| invalid(SEED_ENV, &raw, err))?;
        }
        config.endpoint = value(ENDPOINT_ENV);
        config.access_token = value(ACCESS_TOKEN_ENV);
        Ok(config)
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, raw, "expected true or false")),
    }
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

//! Library exports for the training binary, evaluation tool, benches and tests.
/// Environment-driven job configuration.
pub mod config;
/// Bundled dataset loading.
pub mod dataset;
pub(crate) mod http_client;
/// End-to-end run orchestration.
pub mod job;
/// Tracing subscriber setup.
pub mod logging;
/// Scaler, classifier, split and metrics.
pub mod ml;
/// Artifact naming, serialization and upload.
pub mod publisher;
/// Object storage backends.
pub mod storage;
/// Split, fit and evaluate.
pub mod trainer;

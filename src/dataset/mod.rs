//! Bundled training data.

pub mod loader;

pub use loader::{DatasetLoadError, FeatureTable, Targets, load_data};

//! Entry point for the one-shot training job.

use bcw_trainer::job::run_from_lookup;
use bcw_trainer::logging;
use bcw_trainer::storage::{GcsStore, TokenSource};
use time::OffsetDateTime;

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    if let Err(err) = run() {
        tracing::error!("Training job failed: {err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let summary = run_from_lookup(
        |name| std::env::var(name).ok(),
        |config| {
            GcsStore::new(
                config.bucket.clone(),
                config.endpoint.clone(),
                TokenSource::from_token(config.access_token.clone()),
            )
        },
        OffsetDateTime::now_utc(),
    )
    .map_err(|err| err.to_string())?;
    tracing::info!(
        accuracy = summary.accuracy,
        location = %summary.artifact.stored.location,
        "Training job finished"
    );
    Ok(())
}

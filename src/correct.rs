//
// correct.rs
// Nifti-Tools-rs
//
// The `correct` verb: discover, summarize, confirm, process in parallel, tally.
//

use std::time::Instant;

use chrono::Local;

use crate::batch;
use crate::discovery;
use crate::error::RunError;
use crate::models::{FileRecord, RunConfig, RunSummary};
use crate::report::Reporter;
use crate::toolkit::Toolkit;

/// Runs one batch correction over `config.dataset`.
///
/// Only run-level failures come back as `Err`; per-file failures are inside the summary.
/// Nothing is written and no tool is invoked before the reporter confirms (when `config.confirm`).
pub fn correct_dataset<T, R>(
    config: &RunConfig,
    toolkit: &T,
    reporter: &R,
) -> Result<RunSummary, RunError>
where
    T: Toolkit + ?Sized,
    R: Reporter + ?Sized,
{
    let files = discovery::discover(&config.dataset)?;
    if files.is_empty() {
        return Err(RunError::DiscoveryEmpty(config.dataset.clone()));
    }

    let records = files
        .into_iter()
        .map(|path| FileRecord::new(&config.dataset, path, &config.output))
        .collect::<Result<Vec<_>, _>>()?;

    reporter.plan(config, &records);

    if config.confirm && !reporter.confirm(config, records.len())? {
        return Err(RunError::ConfirmationDeclined);
    }

    let started_at = Local::now();
    let clock = Instant::now();
    reporter.started(records.len());

    let outcomes = batch::run_batch(
        toolkit,
        &records,
        config.orientation,
        config.jobs,
        |outcome| reporter.file_done(outcome),
    )?;

    let summary = RunSummary::new(started_at, clock.elapsed(), outcomes);
    tracing::info!(
        "Run finished: {} successful, {} failed",
        summary.tally.successful,
        summary.tally.failed
    );
    reporter.finished(&summary);
    Ok(summary)
}

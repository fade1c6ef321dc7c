//
// batch.rs
// Nifti-Tools-rs
//
// Fans the per-file pipeline out over a bounded rayon pool and collects one outcome per file.
//

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use rayon::prelude::*;

use crate::error::RunError;
use crate::models::{FailureReason, FileRecord, JobOutcome, Orientation, Outcome};
use crate::pipeline;
use crate::toolkit::Toolkit;

/// Processes every record with at most `jobs` files in flight.
///
/// `on_complete` fires once per file, from the worker thread, in completion order. The returned
/// outcomes follow the order of `records`, whatever order the files finished in.
pub fn run_batch<T, F>(
    toolkit: &T,
    records: &[FileRecord],
    orientation: Orientation,
    jobs: usize,
    on_complete: F,
) -> Result<Vec<JobOutcome>, RunError>
where
    T: Toolkit + ?Sized,
    F: Fn(&JobOutcome) + Sync,
{
    if jobs == 0 {
        return Err(RunError::InvalidJobs);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("nifti-worker-{}", i))
        .build()?;

    tracing::info!(
        "Processing {} files with {} workers | orientation {}",
        records.len(),
        jobs,
        orientation
    );

    let outcomes: Vec<JobOutcome> = pool.install(|| {
        records
            .par_iter()
            .map(|record| {
                let outcome = process_isolated(toolkit, record, orientation);
                on_complete(&outcome);
                outcome
            })
            .collect()
    });

    Ok(outcomes)
}

/// A panic inside one file's pipeline becomes that file's failure instead of unwinding the batch.
fn process_isolated<T: Toolkit + ?Sized>(
    toolkit: &T,
    record: &FileRecord,
    orientation: Orientation,
) -> JobOutcome {
    panic::catch_unwind(AssertUnwindSafe(|| {
        pipeline::process_file(toolkit, record, orientation)
    }))
    .unwrap_or_else(|payload| {
        let detail = panic_message(payload.as_ref());
        tracing::error!("Worker panicked on {}: {}", record.input.display(), detail);
        JobOutcome {
            record: record.clone(),
            outcome: Outcome::Failure(FailureReason { step: None, detail }),
            steps: Vec::new(),
            elapsed: Duration::ZERO,
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

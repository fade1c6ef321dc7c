//
// pipeline.rs
// Nifti-Tools-rs
//
// Per-file correction: optional first-volume extraction, deoblique, reorient, then move into place.
//

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::Instant;

use tempfile::{Builder, NamedTempFile};

use crate::error::StepError;
use crate::models::{FailureReason, FileRecord, JobOutcome, Orientation, Outcome, Step};
use crate::toolkit::Toolkit;

const SCRATCH_PREFIX: &str = "nifti-tools-";

/// Runs every step for one file and turns the first failure into a `Failure` outcome.
///
/// Intermediates live in a private scratch directory that is removed on every path.
pub fn process_file<T: Toolkit + ?Sized>(
    toolkit: &T,
    record: &FileRecord,
    orientation: Orientation,
) -> JobOutcome {
    let started = Instant::now();
    let mut steps = Vec::new();

    let outcome = match run_steps(toolkit, record, orientation, &mut steps) {
        Ok(()) => {
            tracing::debug!("Corrected {}", record.output.display());
            Outcome::Success
        }
        Err(reason) => {
            // The results summary lists failures; logging them here would tear the progress bar.
            tracing::debug!("Failed: {} - {}", record.input.display(), reason);
            Outcome::Failure(reason)
        }
    };

    JobOutcome {
        record: record.clone(),
        outcome,
        steps,
        elapsed: started.elapsed(),
    }
}

fn run_steps<T: Toolkit + ?Sized>(
    toolkit: &T,
    record: &FileRecord,
    orientation: Orientation,
    steps: &mut Vec<Step>,
) -> Result<(), FailureReason> {
    let fail = |step: Step| {
        move |err: StepError| FailureReason {
            step: Some(step),
            detail: err.to_string(),
        }
    };

    steps.push(Step::Setup);
    let scratch = Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir()
        .map_err(StepError::io("failed to create scratch directory"))
        .map_err(fail(Step::Setup))?;

    steps.push(Step::Probe);
    let volumes = toolkit
        .volume_count(&record.input)
        .map_err(fail(Step::Probe))?;

    // 3D images go straight to deobliquing.
    let deoblique_input = if volumes > 1 {
        steps.push(Step::ExtractVolume);
        let extracted = scratch.path().join("first_volume.nii.gz");
        toolkit
            .extract_first_volume(&record.input, &extracted)
            .map_err(fail(Step::ExtractVolume))?;
        extracted
    } else {
        record.input.clone()
    };

    steps.push(Step::Deoblique);
    let deobliqued = scratch.path().join("deoblique.nii.gz");
    toolkit
        .deoblique(&deoblique_input, &deobliqued)
        .map_err(fail(Step::Deoblique))?;

    steps.push(Step::Reorient);
    let reoriented = scratch.path().join("reoriented.nii.gz");
    toolkit
        .reorient(&deobliqued, &reoriented, orientation)
        .map_err(fail(Step::Reorient))?;

    steps.push(Step::Finalize);
    move_into_place(&reoriented, &record.output).map_err(fail(Step::Finalize))?;

    if let Err(err) = scratch.close() {
        tracing::warn!("Could not remove scratch directory: {}", err);
    }
    Ok(())
}

/// Moves `from` onto `to`, creating parent directories and replacing any existing file.
fn move_into_place(from: &Path, to: &Path) -> Result<(), StepError> {
    let parent = to
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(StepError::io(format!(
        "failed to create output directory {}",
        parent.display()
    )))?;

    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    // Scratch space can sit on another filesystem: stage a copy beside the target, then swap it in.
    let mut staged = NamedTempFile::new_in(parent).map_err(StepError::io(format!(
        "failed to stage output in {}",
        parent.display()
    )))?;
    let mut source = File::open(from).map_err(StepError::io(format!(
        "failed to read intermediate {}",
        from.display()
    )))?;
    io::copy(&mut source, staged.as_file_mut())
        .map_err(StepError::io(format!("failed to copy into {}", to.display())))?;
    if let Ok(meta) = source.metadata() {
        // Best effort; the staged file is created with owner-only permissions.
        let _ = fs::set_permissions(staged.path(), meta.permissions());
    }
    staged
        .persist(to)
        .map_err(|err| StepError::io(format!("failed to write {}", to.display()))(err.error))?;
    Ok(())
}

//
// error.rs
// Nifti-Tools-rs
//
// Run-level errors that end an invocation, and step errors that end a single file's pipeline.
//

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors that abort the whole run. Per-file problems never end up here.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Dataset directory '{}' does not exist", .0.display())]
    DatasetMissing(PathBuf),

    #[error("No T1w files found in {}", .0.display())]
    DiscoveryEmpty(PathBuf),

    #[error("Operation cancelled.")]
    ConfirmationDeclined,

    #[error("Number of parallel jobs must be at least 1")]
    InvalidJobs,

    #[error("{} is not inside dataset root {}", path.display(), root.display())]
    OutsideDataset { path: PathBuf, root: PathBuf },

    #[error("Confirmation prompt failed: {0}")]
    Prompt(#[source] io::Error),

    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl RunError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::DatasetMissing(_) | RunError::DiscoveryEmpty(_) => 2,
            RunError::ConfirmationDeclined => 3,
            _ => 1,
        }
    }
}

/// Failure of one external operation (or the file moves around it) for one file.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {detail}")]
    Exit {
        program: String,
        status: ExitStatus,
        detail: String,
    },

    #[error("could not read a volume count from {program} output {output:?}")]
    Probe { program: String, output: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StepError {
    pub fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> StepError {
        let context = context.into();
        move |source| StepError::Io { context, source }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrientationError {
    #[error("Invalid orientation '{0}': expected three letters such as LPI or RAS")]
    Length(String),

    #[error("Invalid orientation '{code}': '{letter}' is not one of L, R, A, P, I, S")]
    UnknownLetter { code: String, letter: char },

    #[error("Invalid orientation '{code}': axis of '{letter}' appears twice")]
    RepeatedAxis { code: String, letter: char },
}

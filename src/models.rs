//
// models.rs
// Nifti-Tools-rs
//
// Run configuration, file records, and per-file outcomes shared by the batch runner and the reporter.
//

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};

use crate::error::{OrientationError, RunError};

/// Each orientation letter must come from a distinct pair.
const AXIS_PAIRS: [[char; 2]; 3] = [['L', 'R'], ['A', 'P'], ['I', 'S']];

/// Three-letter axis code (e.g. `LPI`, `RAS`) naming the direction each storage axis increases toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation([char; 3]);

impl Orientation {
    pub const LPI: Orientation = Orientation(['L', 'P', 'I']);

    pub fn code(&self) -> String {
        self.0.iter().collect()
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::LPI
    }
}

impl FromStr for Orientation {
    type Err = OrientationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let letters: Vec<char> = s.trim().chars().map(|c| c.to_ascii_uppercase()).collect();
        if letters.len() != 3 {
            return Err(OrientationError::Length(s.to_string()));
        }

        let mut seen = [false; 3];
        for &letter in &letters {
            let axis = AXIS_PAIRS
                .iter()
                .position(|pair| pair.contains(&letter))
                .ok_or_else(|| OrientationError::UnknownLetter {
                    code: s.to_string(),
                    letter,
                })?;
            if seen[axis] {
                return Err(OrientationError::RepeatedAxis {
                    code: s.to_string(),
                    letter,
                });
            }
            seen[axis] = true;
        }

        Ok(Self([letters[0], letters[1], letters[2]]))
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl Serialize for Orientation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

/// Where corrected images are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    InPlace,
    /// Mirror each file's path relative to the dataset root under this directory.
    Directory(PathBuf),
}

impl OutputMode {
    pub fn from_option(output: Option<PathBuf>) -> Self {
        output.map_or(OutputMode::InPlace, OutputMode::Directory)
    }

    /// Derive the output path for `input`. Injective for inputs under `root`.
    pub fn output_for(&self, root: &Path, input: &Path) -> Result<PathBuf, RunError> {
        match self {
            OutputMode::InPlace => Ok(input.to_path_buf()),
            OutputMode::Directory(dir) => {
                let relative = input
                    .strip_prefix(root)
                    .map_err(|_| RunError::OutsideDataset {
                        path: input.to_path_buf(),
                        root: root.to_path_buf(),
                    })?;
                Ok(dir.join(relative))
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            OutputMode::InPlace => "In-place".to_string(),
            OutputMode::Directory(dir) => dir.display().to_string(),
        }
    }
}

/// Validated parameters for one invocation; never changes once built.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub dataset: PathBuf,
    pub orientation: Orientation,
    pub output: OutputMode,
    pub jobs: usize,
    pub confirm: bool,
}

impl RunConfig {
    pub fn new(
        dataset: PathBuf,
        orientation: Orientation,
        output: OutputMode,
        jobs: usize,
        confirm: bool,
    ) -> Result<Self, RunError> {
        if jobs == 0 {
            return Err(RunError::InvalidJobs);
        }
        Ok(Self {
            dataset,
            orientation,
            output,
            jobs,
            confirm,
        })
    }
}

/// Number of workers used when `--jobs` is not given.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// A discovered input and the path its corrected image is written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl FileRecord {
    pub fn new(root: &Path, input: PathBuf, mode: &OutputMode) -> Result<Self, RunError> {
        let output = mode.output_for(root, &input)?;
        Ok(Self { input, output })
    }
}

/// Stages of the per-file pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Setup,
    Probe,
    ExtractVolume,
    Deoblique,
    Reorient,
    Finalize,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Setup => "setup",
            Step::Probe => "volume probe",
            Step::ExtractVolume => "4D->3D extraction",
            Step::Deoblique => "deoblique",
            Step::Reorient => "reorient",
            Step::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Why a file failed. `step` is `None` when the worker itself panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub step: Option<Step>,
    pub detail: String,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "{} failed: {}", step, self.detail),
            None => write!(f, "worker panicked: {}", self.detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(FailureReason),
}

/// Result of running the pipeline on one file. Created once, never mutated.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub record: FileRecord,
    pub outcome: Outcome,
    /// Steps that were started, including the one that failed.
    pub steps: Vec<Step>,
    pub elapsed: Duration,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.outcome {
            Outcome::Success => None,
            Outcome::Failure(reason) => Some(reason),
        }
    }
}

/// Success/failure counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub successful: usize,
    pub failed: usize,
}

impl Tally {
    pub fn from_outcomes(outcomes: &[JobOutcome]) -> Self {
        let successful = outcomes.iter().filter(|o| o.is_success()).count();
        Self {
            successful,
            failed: outcomes.len() - successful,
        }
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed
    }
}

/// Everything known about a finished batch.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
    pub outcomes: Vec<JobOutcome>,
    pub tally: Tally,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Local>, elapsed: Duration, outcomes: Vec<JobOutcome>) -> Self {
        let tally = Tally::from_outcomes(&outcomes);
        Self {
            started_at,
            elapsed,
            outcomes,
            tally,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FileRecord, &FailureReason)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.failure().map(|reason| (&o.record, reason)))
    }
}

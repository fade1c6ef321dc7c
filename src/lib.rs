//
// lib.rs
// Nifti-Tools-rs
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//

// Public surface of the library: `correct` drives a run, the rest are its building blocks.
pub mod batch;
pub mod cli;
pub mod correct;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod toolkit;

pub use cli::{run as run_cli, Cli, Commands};
pub use correct::correct_dataset;
pub use error::{RunError, StepError};
pub use models::{FileRecord, JobOutcome, Orientation, Outcome, OutputMode, RunConfig, RunSummary, Tally};
pub use report::{Reporter, TerminalReporter};
pub use toolkit::{AfniToolkit, Toolkit};

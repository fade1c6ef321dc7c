//
// main.rs
// Nifti-Tools-rs
//
// Entry point: runs the CLI and maps run-level errors to distinct exit codes.
//

use std::process::ExitCode;

use console::style;
use nifti_tools::{cli, RunError};

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(err) => match err.downcast_ref::<RunError>() {
            Some(run_err) => {
                // Nothing matched, or the user said no: not a crash, just nothing to do.
                if matches!(
                    run_err,
                    RunError::DiscoveryEmpty(_) | RunError::ConfirmationDeclined
                ) {
                    eprintln!("{}", style(run_err).yellow());
                } else {
                    eprintln!("{} {}", style("Error:").red().bold(), run_err);
                }
                ExitCode::from(run_err.exit_code())
            }
            None => {
                eprintln!("{} {:#}", style("Error:").red().bold(), err);
                ExitCode::FAILURE
            }
        },
    }
}

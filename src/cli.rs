//
// cli.rs
// Nifti-Tools-rs
//
// Clap definitions for the correct/find/check-tools verbs and their dispatch.
//

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::error::RunError;
use crate::models::{default_jobs, Orientation, OutputMode, RunConfig};
use crate::report::{self, TerminalReporter};
use crate::toolkit::AfniToolkit;
use crate::{correct, discovery, logging};

/// Top-level arguments; global logging flags apply to every verb.
#[derive(Parser)]
#[command(name = "nifti-tools")]
#[command(about = "Correct T1w NIfTI headers in bulk using AFNI", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the first volume of 4D images, deoblique, and reorient every T1w file
    Correct(CorrectArgs),
    /// List the T1w files a correction run would process
    Find {
        #[arg(short, long)]
        dataset: PathBuf,
    },
    /// Report whether the AFNI programs can be found
    CheckTools {
        #[arg(long, env = "AFNI_DIR")]
        afni_dir: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
#[command(after_help = "Orientation codes (default: LPI):\n  \
    L/R = Left/Right, A/P = Anterior/Posterior, I/S = Inferior/Superior\n  \
    Examples: LPI, RAS, LAI")]
pub struct CorrectArgs {
    /// Dataset directory containing T1w files
    #[arg(short, long)]
    pub dataset: PathBuf,

    /// Output directory (files are corrected in place when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target orientation code
    #[arg(
        long = "orient",
        visible_alias = "orientation",
        value_name = "ORIENT",
        default_value = "LPI"
    )]
    pub orientation: Orientation,

    /// Number of parallel jobs (default: number of CPUs)
    #[arg(short, long, value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Skip the confirmation prompt (without a terminal, one line of stdin is read: y/yes proceeds)
    #[arg(long)]
    pub no_confirm: bool,

    /// Write a JSON report of every file's outcome
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Directory holding the AFNI programs (searched on PATH when unset)
    #[arg(long, env = "AFNI_DIR")]
    pub afni_dir: Option<PathBuf>,
}

fn parse_jobs(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl CorrectArgs {
    pub fn run_config(&self) -> Result<RunConfig, RunError> {
        RunConfig::new(
            self.dataset.clone(),
            self.orientation,
            OutputMode::from_option(self.output.clone()),
            self.jobs.unwrap_or_else(default_jobs),
            !self.no_confirm,
        )
    }
}

pub fn run() -> anyhow::Result<ExitCode> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Correct(args) => run_correct(&args),
        Commands::Find { dataset } => {
            let files = discovery::discover(&dataset)?;
            for file in &files {
                println!("{}", file.display());
            }
            println!("Found {} T1w files.", files.len());
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckTools { afni_dir } => {
            let toolkit = AfniToolkit::new(afni_dir);
            let mut all_found = true;
            for (name, path) in toolkit.locate_programs() {
                match path {
                    Some(path) => println!("  {:<12} {}", name, path.display()),
                    None => {
                        all_found = false;
                        println!("  {:<12} not found", name);
                    }
                }
            }
            Ok(if all_found {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn run_correct(args: &CorrectArgs) -> anyhow::Result<ExitCode> {
    let config = args.run_config()?;
    let toolkit = AfniToolkit::new(args.afni_dir.clone());

    // Missing tools still fail per file; this only warns early.
    let missing = toolkit.missing_programs();
    if !missing.is_empty() {
        tracing::warn!(
            "AFNI programs not found: {}. Every file will fail at the step that needs them.",
            missing.join(", ")
        );
    }

    println!("{}", report::render_header());
    let reporter = TerminalReporter::new();
    let summary = correct::correct_dataset(&config, &toolkit, &reporter)?;

    if let Some(path) = &args.report {
        report::write_report(path, &config, &summary)
            .with_context(|| format!("Run finished but the report could not be saved to {:?}", path))?;
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_behaviour() {
        let cli = Cli::try_parse_from(["nifti-tools", "correct", "-d", "/data"]).unwrap();
        let Commands::Correct(args) = cli.command else {
            panic!("expected correct");
        };
        let config = args.run_config().unwrap();
        assert_eq!(config.orientation, Orientation::LPI);
        assert_eq!(config.output, OutputMode::InPlace);
        assert_eq!(config.jobs, default_jobs());
        assert!(config.confirm);
    }

    #[test]
    fn flags_build_the_run_config() {
        let cli = Cli::try_parse_from([
            "nifti-tools",
            "correct",
            "--dataset",
            "/data",
            "--orientation",
            "ras",
            "-o",
            "/out",
            "-j",
            "3",
            "--no-confirm",
        ])
        .unwrap();
        let Commands::Correct(args) = cli.command else {
            panic!("expected correct");
        };
        let config = args.run_config().unwrap();
        assert_eq!(config.orientation.code(), "RAS");
        assert_eq!(config.output, OutputMode::Directory(PathBuf::from("/out")));
        assert_eq!(config.jobs, 3);
        assert!(!config.confirm);
    }

    #[test]
    fn invalid_orientation_and_jobs_are_usage_errors() {
        assert!(Cli::try_parse_from(["nifti-tools", "correct", "-d", "/d", "--orient", "XYZ"])
            .is_err());
        assert!(Cli::try_parse_from(["nifti-tools", "correct", "-d", "/d", "-j", "0"]).is_err());
        assert!(Cli::try_parse_from(["nifti-tools", "correct"]).is_err());
    }
}

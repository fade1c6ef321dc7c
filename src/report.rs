//
// report.rs
// Nifti-Tools-rs
//
// Pre-run summary, confirmation gate, live progress bar, post-run tally, and the JSON run report.
//

use std::fmt::Write as _;
use std::fs;
use std::io::{self, BufRead, IsTerminal};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;

use crate::error::RunError;
use crate::models::{FileRecord, JobOutcome, Orientation, RunConfig, RunSummary, Step};

/// Failure reasons listed after a run; the rest are only counted.
const MAX_LISTED_ERRORS: usize = 5;
const MAX_ERROR_CHARS: usize = 100;

/// Observes a run from plan to tally. Called from worker threads during processing.
pub trait Reporter: Sync {
    fn plan(&self, config: &RunConfig, records: &[FileRecord]);
    /// `Ok(false)` stops the run before anything is touched.
    fn confirm(&self, config: &RunConfig, file_count: usize) -> Result<bool, RunError>;
    fn started(&self, total: usize);
    fn file_done(&self, outcome: &JobOutcome);
    fn finished(&self, summary: &RunSummary);
}

/// Interactive reporter: tables on stdout, prompt and progress bar on the terminal.
pub struct TerminalReporter {
    progress: ProgressBar,
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self {
            progress: ProgressBar::hidden(),
        }
    }
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for TerminalReporter {
    fn plan(&self, config: &RunConfig, records: &[FileRecord]) {
        println!("{}", render_plan(config, records.len()));
    }

    fn confirm(&self, config: &RunConfig, file_count: usize) -> Result<bool, RunError> {
        let prompt = format!(
            "Proceed with processing {} files to {} orientation?",
            file_count, config.orientation
        );

        // Piped answers (`echo y | nifti-tools correct ...`) are read as a plain line.
        if !io::stdin().is_terminal() {
            eprintln!("{} [y/N]", prompt);
            return read_answer(io::stdin().lock()).map_err(RunError::Prompt);
        }

        let answer = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact_opt();

        match answer {
            Ok(choice) => Ok(choice == Some(true)),
            // Ctrl+C at the prompt counts as "no".
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => Ok(false),
            Err(e) => Err(RunError::Prompt(io::Error::other(e))),
        }
    }

    fn started(&self, total: usize) {
        let pb = &self.progress;
        pb.reset();
        pb.set_length(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) • {elapsed_precise} • eta {eta}",
        ) {
            pb.set_style(style.progress_chars("##-"));
        }
        pb.set_message("Processing T1w files...");
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.enable_steady_tick(Duration::from_millis(120));
    }

    fn file_done(&self, outcome: &JobOutcome) {
        if let Some(name) = outcome.record.input.file_name() {
            self.progress
                .set_message(name.to_string_lossy().into_owned());
        }
        self.progress.inc(1);
    }

    fn finished(&self, summary: &RunSummary) {
        self.progress.finish_and_clear();
        println!("{}", render_results(summary));
    }
}

/// Reads one line of a non-interactive answer: `y` or `yes` in any case accepts, anything else
/// (including end of input) declines.
pub fn read_answer<R: BufRead>(mut reader: R) -> io::Result<bool> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let answer = line.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

pub fn render_header() -> String {
    format!(
        "{}\n{}\n",
        style("NIfTI Header Correction Tool").bold().magenta(),
        style("Processing T1w files with 4D->3D conversion, deobliquing, and reorientation").dim()
    )
}

pub fn render_plan(config: &RunConfig, file_count: usize) -> String {
    let rows = [
        ("Dataset Path", config.dataset.display().to_string()),
        ("Files Found", file_count.to_string()),
        ("Target Orientation", config.orientation.to_string()),
        ("Parallel Jobs", config.jobs.to_string()),
        ("Output Mode", config.output.label()),
    ];

    let mut out = format!("{}\n", style("Processing Summary").bold().blue());
    for (label, value) in rows {
        let _ = writeln!(
            out,
            "  {} {}",
            style(format!("{:<20}", label)).cyan(),
            style(value).green()
        );
    }
    out
}

pub fn render_results(summary: &RunSummary) -> String {
    let tally = summary.tally;
    let mut out = format!("{}\n", style("Processing Results").bold().blue());
    let _ = writeln!(out, "  {:<12}{:>8}", "Successful", style(tally.successful).green());
    let _ = writeln!(out, "  {:<12}{:>8}", "Failed", style(tally.failed).red());
    let _ = writeln!(out, "  {:<12}{:>8}", "Total", style(tally.total()).blue());

    if tally.failed > 0 {
        let _ = writeln!(
            out,
            "\n{}",
            style(format!("Errors ({} total)", tally.failed)).red().bold()
        );
        for (record, reason) in summary.failures().take(MAX_LISTED_ERRORS) {
            let name = record
                .input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| record.input.display().to_string());
            let _ = writeln!(out, "  • {}: {}", name, truncate(&reason.to_string()));
        }
        if tally.failed > MAX_LISTED_ERRORS {
            let _ = writeln!(
                out,
                "  {}",
                style(format!(
                    "... and {} more errors",
                    tally.failed - MAX_LISTED_ERRORS
                ))
                .dim()
            );
        }
    }

    let _ = write!(
        out,
        "\n{}",
        style(format!(
            "Total processing time: {:.1} seconds",
            summary.elapsed.as_secs_f64()
        ))
        .dim()
    );
    out
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_ERROR_CHARS {
        let head: String = text.chars().take(MAX_ERROR_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Machine-readable record of one run, written with `--report`.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub started_at: String,
    pub elapsed_seconds: f64,
    pub dataset: &'a Path,
    pub orientation: Orientation,
    pub output_mode: String,
    pub jobs: usize,
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
    pub files: Vec<FileReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub status: &'static str,
    pub failed_step: Option<Step>,
    pub error: Option<&'a str>,
    pub steps: &'a [Step],
    pub elapsed_seconds: f64,
}

impl<'a> RunReport<'a> {
    pub fn new(config: &'a RunConfig, summary: &'a RunSummary) -> Self {
        let files = summary
            .outcomes
            .iter()
            .map(|o| {
                let failure = o.failure();
                FileReport {
                    input: &o.record.input,
                    output: &o.record.output,
                    status: if failure.is_some() { "error" } else { "success" },
                    failed_step: failure.and_then(|r| r.step),
                    error: failure.map(|r| r.detail.as_str()),
                    steps: &o.steps,
                    elapsed_seconds: o.elapsed.as_secs_f64(),
                }
            })
            .collect();

        Self {
            started_at: summary.started_at.to_rfc3339(),
            elapsed_seconds: summary.elapsed.as_secs_f64(),
            dataset: &config.dataset,
            orientation: config.orientation,
            output_mode: config.output.label(),
            jobs: config.jobs,
            successful: summary.tally.successful,
            failed: summary.tally.failed,
            total: summary.tally.total(),
            files,
        }
    }
}

pub fn write_report(path: &Path, config: &RunConfig, summary: &RunSummary) -> Result<()> {
    let report = RunReport::new(config, summary);
    let text = serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
    fs::write(path, text).with_context(|| format!("Failed to write report {:?}", path))?;
    tracing::info!("Run report written to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureReason, OutputMode, Outcome};
    use chrono::Local;
    use std::io::Cursor;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn piped_answers_accept_only_yes() {
        for yes in ["y\n", "Y\n", "yes\n", "  YES  \r\n", "y"] {
            assert!(read_answer(Cursor::new(yes)).unwrap(), "{:?}", yes);
        }
        for no in ["n\n", "\n", "", "nope\n", "yess\n", "no\ny\n"] {
            assert!(!read_answer(Cursor::new(no)).unwrap(), "{:?}", no);
        }
    }

    fn config() -> RunConfig {
        RunConfig::new(
            PathBuf::from("/data/ds"),
            "RAS".parse().unwrap(),
            OutputMode::Directory(PathBuf::from("/out")),
            4,
            false,
        )
        .unwrap()
    }

    fn outcome(name: &str, failure: Option<&str>) -> JobOutcome {
        let input = PathBuf::from(format!("/data/ds/{}/anat/{}_T1w.nii.gz", name, name));
        JobOutcome {
            record: FileRecord {
                output: input.clone(),
                input,
            },
            outcome: match failure {
                None => Outcome::Success,
                Some(detail) => Outcome::Failure(FailureReason {
                    step: Some(Step::Reorient),
                    detail: detail.to_string(),
                }),
            },
            steps: vec![Step::Setup, Step::Probe, Step::Deoblique, Step::Reorient],
            elapsed: Duration::from_millis(250),
        }
    }

    fn summary(outcomes: Vec<JobOutcome>) -> RunSummary {
        RunSummary::new(Local::now(), Duration::from_secs(3), outcomes)
    }

    #[test]
    fn plan_lists_run_parameters() {
        let text = render_plan(&config(), 12);
        assert!(text.contains("Dataset Path"));
        assert!(text.contains("/data/ds"));
        assert!(text.contains("12"));
        assert!(text.contains("RAS"));
        assert!(text.contains("/out"));
    }

    #[test]
    fn results_list_first_errors_and_count_the_rest() {
        let mut outcomes = vec![outcome("sub-00", None)];
        for i in 1..=7 {
            outcomes.push(outcome(&format!("sub-0{}", i), Some("** ERROR: bad orient")));
        }
        let text = render_results(&summary(outcomes));

        assert!(text.contains("Errors (7 total)"));
        assert!(text.contains("sub-01_T1w.nii.gz: reorient failed: ** ERROR: bad orient"));
        assert!(text.contains("sub-05_T1w.nii.gz"));
        assert!(!text.contains("sub-06_T1w.nii.gz"));
        assert!(text.contains("... and 2 more errors"));
        assert!(text.contains("Total processing time: 3.0 seconds"));
    }

    #[test]
    fn long_errors_are_truncated() {
        let long = "x".repeat(300);
        let cut = truncate(&long);
        assert_eq!(cut.chars().count(), MAX_ERROR_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn report_records_every_file() {
        let dir = tempdir().expect("tmpdir");
        let path = dir.path().join("report.json");
        let cfg = config();
        let run = summary(vec![
            outcome("sub-01", None),
            outcome("sub-02", Some("3dresample exited with exit status: 1: nope")),
        ]);
        write_report(&path, &cfg, &run).expect("write report");

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["orientation"], "RAS");
        assert_eq!(value["successful"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["total"], 2);
        assert_eq!(value["files"].as_array().unwrap().len(), 2);
        assert_eq!(value["files"][1]["status"], "error");
        assert_eq!(value["files"][1]["failed_step"], "reorient");
        assert_eq!(value["files"][0]["error"], serde_json::Value::Null);
        assert_eq!(value["files"][0]["steps"][1], "probe");
    }
}

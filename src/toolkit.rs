//
// toolkit.rs
// Nifti-Tools-rs
//
// Thin wrappers over the AFNI command-line programs that do the actual image work.
//

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::StepError;
use crate::models::Orientation;

/// Programs invoked per file: probe, extraction, deoblique, reorient.
pub const PROGRAMS: [&str; 4] = ["3dinfo", "3dcalc", "3dWarp", "3dresample"];

/// The four external operations a file goes through.
///
/// Implementations are shared across worker threads.
pub trait Toolkit: Sync {
    /// Number of volumes (sub-bricks) stored in the image; more than one means 4D.
    fn volume_count(&self, input: &Path) -> Result<usize, StepError>;
    fn extract_first_volume(&self, input: &Path, output: &Path) -> Result<(), StepError>;
    fn deoblique(&self, input: &Path, output: &Path) -> Result<(), StepError>;
    fn reorient(
        &self,
        input: &Path,
        output: &Path,
        orientation: Orientation,
    ) -> Result<(), StepError>;
}

/// Runs the AFNI binaries found in `bin_dir`, or on `PATH` when unset.
#[derive(Debug, Clone, Default)]
pub struct AfniToolkit {
    bin_dir: Option<PathBuf>,
}

impl AfniToolkit {
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    fn program_path(&self, name: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Where each program resolves to, `None` when it cannot be found.
    pub fn locate_programs(&self) -> Vec<(&'static str, Option<PathBuf>)> {
        PROGRAMS
            .iter()
            .map(|&name| {
                let found = match &self.bin_dir {
                    Some(dir) => Some(dir.join(name)).filter(|p| p.is_file()),
                    None => find_in_path(name),
                };
                (name, found)
            })
            .collect()
    }

    pub fn missing_programs(&self) -> Vec<&'static str> {
        self.locate_programs()
            .into_iter()
            .filter(|(_, path)| path.is_none())
            .map(|(name, _)| name)
            .collect()
    }

    /// Run one program to completion; stdout on success, stderr folded into the error otherwise.
    fn run(&self, name: &str, args: &[OsString]) -> Result<String, StepError> {
        let program = self.program_path(name);
        tracing::debug!("Running {} {:?}", program.display(), args);

        let output = Command::new(&program)
            .args(args)
            .env("AFNI_NO_OBLIQUE_WARNING", "YES")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| StepError::Launch {
                program: name.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                "no error output".to_string()
            } else {
                stderr
            };
            return Err(StepError::Exit {
                program: name.to_string(),
                status: output.status,
                detail,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Toolkit for AfniToolkit {
    fn volume_count(&self, input: &Path) -> Result<usize, StepError> {
        let stdout = self.run("3dinfo", &["-nv".into(), input.into()])?;
        parse_volume_count(&stdout).ok_or_else(|| StepError::Probe {
            program: "3dinfo".to_string(),
            output: stdout.trim().to_string(),
        })
    }

    fn extract_first_volume(&self, input: &Path, output: &Path) -> Result<(), StepError> {
        // AFNI sub-brick selector: keep volume 0 only.
        let mut selected = input.as_os_str().to_os_string();
        selected.push("[0]");
        self.run(
            "3dcalc",
            &[
                "-a".into(),
                selected,
                "-expr".into(),
                "a".into(),
                "-prefix".into(),
                output.into(),
            ],
        )
        .map(drop)
    }

    fn deoblique(&self, input: &Path, output: &Path) -> Result<(), StepError> {
        self.run(
            "3dWarp",
            &[
                "-deoblique".into(),
                "-prefix".into(),
                output.into(),
                input.into(),
            ],
        )
        .map(drop)
    }

    fn reorient(
        &self,
        input: &Path,
        output: &Path,
        orientation: Orientation,
    ) -> Result<(), StepError> {
        self.run(
            "3dresample",
            &[
                "-orient".into(),
                orientation.code().into(),
                "-prefix".into(),
                output.into(),
                "-input".into(),
                input.into(),
            ],
        )
        .map(drop)
    }
}

fn parse_volume_count(stdout: &str) -> Option<usize> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()?
        .parse()
        .ok()
}

fn find_in_path(tool: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(tool))
        .find(|full| full.is_file())
}

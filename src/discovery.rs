//
// discovery.rs
// Nifti-Tools-rs
//
// Recursive search for T1-weighted NIfTI images under a dataset root.
//

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::RunError;

/// File name suffix of the images this tool corrects.
pub const T1W_SUFFIX: &str = "T1w.nii.gz";

/// Collects every regular file under `root` whose name ends in [`T1W_SUFFIX`].
///
/// An empty result is not an error here; the caller decides whether that ends the run.
/// Paths are sorted so repeated runs over an unchanged tree agree. Symlinked files count
/// (annexed datasets store images that way); dot-prefixed files and directories are skipped.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, RunError> {
    if !root.is_dir() {
        return Err(RunError::DatasetMissing(root.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.path().is_file() && is_t1w(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    tracing::info!("Found {} T1w files under {}", files.len(), root.display());
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map_or(false, |name| name.starts_with('.'))
}

fn is_t1w(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.ends_with(T1W_SUFFIX))
}

//! Input enumeration.
//!
//! A file is taken as-is. A directory is walked recursively for files
//! with the requested extension (ASCII case-insensitive). Directory
//! symlinks are not followed. The result is sorted by path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::BatchError;

/// Extension matched when none is given.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// List the images to analyze under `root`.
///
/// # Errors
///
/// Returns [`BatchError::Inputs`] if `root` is neither a file nor a
/// directory, or a directory cannot be read. Returns
/// [`BatchError::NoInputs`] if nothing matches.
pub fn collect_inputs(root: &Path, extension: &str) -> Result<Vec<PathBuf>, BatchError> {
    let inputs_error = |source| BatchError::Inputs {
        path: root.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(root).map_err(inputs_error)?;
    let mut files = if metadata.is_file() {
        vec![root.to_path_buf()]
    } else if metadata.is_dir() {
        let mut found = Vec::new();
        walk(root, extension, &mut found).map_err(inputs_error)?;
        found
    } else {
        return Err(inputs_error(io::Error::new(
            io::ErrorKind::InvalidInput,
            "neither a regular file nor a directory",
        )));
    };

    if files.is_empty() {
        return Err(BatchError::NoInputs {
            path: root.to_path_buf(),
            extension: extension.to_owned(),
        });
    }
    files.sort();
    Ok(files)
}

/// Whether `path` ends in `.extension`, ignoring ASCII case.
#[must_use]
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension.trim_start_matches('.')))
}

fn walk(dir: &Path, extension: &str, found: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(&path, extension, found)?;
        } else if has_extension(&path, extension) && path.is_file() {
            found.push(path);
        }
    }
    Ok(())
}

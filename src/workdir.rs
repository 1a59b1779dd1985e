//! Working-directory resolution for chat runs.
//!
//! A run may name its working directory explicitly; otherwise the
//! configured default applies. Relative paths are joined to the default
//! so UI-supplied shorthand like `projects/demo` resolves predictably.

use std::path::{Path, PathBuf};

use crate::{AppError, Result};

/// Resolve and validate the working directory for a run.
///
/// Resolution order: the requested path if present, else `default`.
/// Relative requests are joined to `default`. The result must exist and
/// be a directory.
///
/// # Errors
///
/// Returns `AppError::Spawn` when the resolved path does not exist or is
/// not a directory — a run can never start in an invalid directory.
pub fn resolve(requested: Option<&str>, default: &Path) -> Result<PathBuf> {
    let work_dir = match requested {
        None | Some("") => default.to_path_buf(),
        Some(raw) => {
            let candidate = PathBuf::from(raw);
            if candidate.is_absolute() {
                candidate
            } else {
                default.join(candidate)
            }
        }
    };

    let meta = std::fs::metadata(&work_dir).map_err(|_| {
        AppError::Spawn(format!(
            "working directory does not exist: {}",
            work_dir.display()
        ))
    })?;
    if !meta.is_dir() {
        return Err(AppError::Spawn(format!(
            "path is not a directory: {}",
            work_dir.display()
        )));
    }

    Ok(work_dir)
}

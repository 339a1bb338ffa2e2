//! Clean install: empty a mod folder before new files are extracted into it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::backup::is_backup_file;
use crate::paths::is_preview_file;

/// What a clean pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub deleted_files: usize,
    pub deleted_dirs: usize,
    pub kept_files: usize,
    /// Items that could not be removed
    pub failures: usize,
}

/// Delete everything in `mod_dir` except backup archives and, when
/// `preserve_previews` is set, preview images. Directories left empty are
/// removed afterwards, deepest first. `mod_dir` itself is kept.
///
/// Failures on individual items are logged and counted, never fatal.
pub fn clean_mod_folder(mod_dir: &Path, preserve_previews: bool) -> CleanReport {
    let mut report = CleanReport::default();

    // Collect files to delete (can't delete while iterating)
    let mut to_delete: Vec<PathBuf> = Vec::new();
    let mut dirs: Vec<PathBuf> = Vec::new();

    for entry in walkdir::WalkDir::new(mod_dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path() == mod_dir {
            continue;
        }
        if entry.file_type().is_dir() {
            dirs.push(entry.path().to_path_buf());
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if is_backup_file(&name) || (preserve_previews && is_preview_file(&name)) {
            report.kept_files += 1;
            continue;
        }
        to_delete.push(entry.path().to_path_buf());
    }

    for path in &to_delete {
        match fs::remove_file(path) {
            Ok(()) => report.deleted_files += 1,
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                report.failures += 1;
            }
        }
    }

    // Deepest first so parents are empty by the time they are checked
    dirs.sort_by_key(|d| std::cmp::Reverse(d.as_os_str().len()));
    for dir in &dirs {
        let is_empty = fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty {
            continue;
        }
        match fs::remove_dir(dir) {
            Ok(()) => report.deleted_dirs += 1,
            Err(e) => {
                debug!("Failed to remove directory {}: {}", dir.display(), e);
                report.failures += 1;
            }
        }
    }

    info!(
        "Cleaned {}: {} files and {} directories removed, {} kept",
        mod_dir.display(),
        report.deleted_files,
        report.deleted_dirs,
        report.kept_files
    );
    report
}

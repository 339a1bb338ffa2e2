//! Snapshot a mod folder before it is overwritten.
//!
//! Backups are plain uncompressed zips stored inside the mod folder itself
//! (`fxmm-backup-001.zip`, `fxmm-backup-002.zip`, ...). They are never
//! removed automatically and are left alone by clean installs.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::paths;

const BACKUP_PREFIX: &str = "fxmm-backup-";
const BACKUP_SUFFIX: &str = ".zip";

/// `fxmm-backup-007.zip`
pub fn backup_file_name(number: u32) -> String {
    format!("{}{:03}{}", BACKUP_PREFIX, number, BACKUP_SUFFIX)
}

/// Whether a file name is one of our backup archives
pub fn is_backup_file(name: &str) -> bool {
    name.strip_prefix(BACKUP_PREFIX)
        .and_then(|rest| rest.strip_suffix(BACKUP_SUFFIX))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// First backup path in `mod_dir` that does not exist yet
pub fn next_backup_path(mod_dir: &Path) -> PathBuf {
    let mut number = 1;
    loop {
        let candidate = mod_dir.join(backup_file_name(number));
        if !candidate.exists() {
            return candidate;
        }
        number += 1;
    }
}

/// Zip every file under `mod_dir` (except earlier backups) into the next
/// free backup slot. Returns the path of the new archive.
pub fn create_backup(mod_dir: &Path) -> Result<PathBuf> {
    let backup_path = next_backup_path(mod_dir);

    // Collect first so the archive being written is never walked
    let mut files: Vec<(PathBuf, String)> = Vec::new();
    for entry in walkdir::WalkDir::new(mod_dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_backup_file(&name) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(mod_dir) else {
            continue;
        };
        let relative = paths::to_linux_path(&relative.to_string_lossy());
        files.push((entry.path().to_path_buf(), relative));
    }

    write_backup(&backup_path, &files)?;

    info!(
        "Backed up {} files to {}",
        files.len(),
        backup_path.display()
    );
    Ok(backup_path)
}

/// Write `files` into a new zip at `backup_path`. A failed write removes
/// the partial archive so it is never mistaken for a good backup.
fn write_backup(backup_path: &Path, files: &[(PathBuf, String)]) -> Result<()> {
    let result = write_entries(backup_path, files);
    if result.is_err() && backup_path.exists() {
        if let Err(e) = fs::remove_file(backup_path) {
            warn!("Could not remove partial backup {}: {}", backup_path.display(), e);
        }
    }
    result
}

fn write_entries(backup_path: &Path, files: &[(PathBuf, String)]) -> Result<()> {
    let out = File::create(backup_path)
        .with_context(|| format!("Failed to create backup {}", backup_path.display()))?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(out));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .large_file(true);

    for (path, relative) in files {
        zip.start_file(relative.as_str(), options)
            .with_context(|| format!("Failed to add {} to backup", relative))?;
        let mut input = BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        );
        io::copy(&mut input, &mut zip)
            .with_context(|| format!("Failed to copy {} into backup", relative))?;
        debug!("Backed up {}", relative);
    }

    zip.finish().context("Failed to finalize backup archive")?;
    Ok(())
}

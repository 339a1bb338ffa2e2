//! Per-format readers.
//!
//! Every format exposes the same two operations: list all entries, and walk
//! the regular files handing each one to a visitor as a plain `Read`.
//! The visitor returns `Ok(false)` to stop early.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use super::{ArchiveEntry, ArchiveError, ArchiveType};
use crate::paths::to_linux_path;

/// Visitor called once per regular file entry
pub(super) type EntryVisitor<'a> =
    dyn FnMut(&str, &mut dyn Read) -> Result<bool, ArchiveError> + 'a;

fn corrupt(path: &Path, err: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Corrupt {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

pub(super) fn list(path: &Path, kind: ArchiveType) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    match kind {
        ArchiveType::Zip => list_zip(path),
        ArchiveType::SevenZ => list_7z(path),
        ArchiveType::Rar => list_rar(path),
        ArchiveType::Tar
        | ArchiveType::TarGz
        | ArchiveType::TarZst
        | ArchiveType::TarXz
        | ArchiveType::TarBz2 => list_tar(path, kind),
    }
}

pub(super) fn visit_files(
    path: &Path,
    kind: ArchiveType,
    visit: &mut EntryVisitor<'_>,
) -> Result<(), ArchiveError> {
    match kind {
        ArchiveType::Zip => visit_zip(path, visit),
        ArchiveType::SevenZ => visit_7z(path, visit),
        ArchiveType::Rar => visit_rar(path, visit),
        ArchiveType::Tar
        | ArchiveType::TarGz
        | ArchiveType::TarZst
        | ArchiveType::TarXz
        | ArchiveType::TarBz2 => visit_tar(path, kind, visit),
    }
}

// ---------------------------------------------------------------------------
// ZIP
// ---------------------------------------------------------------------------

fn open_zip(path: &Path) -> Result<zip::ZipArchive<BufReader<File>>, ArchiveError> {
    let file = File::open(path)?;
    zip::ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(path, e))
}

fn list_zip(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut archive = open_zip(path)?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        // Raw access reads headers only, so encrypted entries still list
        let entry = archive.by_index_raw(i).map_err(|e| corrupt(path, e))?;
        entries.push(ArchiveEntry {
            path: to_linux_path(entry.name()),
            size: entry.size(),
            is_dir: entry.is_dir(),
        });
    }

    Ok(entries)
}

fn visit_zip(path: &Path, visit: &mut EntryVisitor<'_>) -> Result<(), ArchiveError> {
    let mut archive = open_zip(path)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| corrupt(path, e))?;
        if entry.is_dir() {
            continue;
        }
        let name = to_linux_path(entry.name());
        if !visit(&name, &mut entry)? {
            break;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// 7z
// ---------------------------------------------------------------------------

fn list_7z(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let archive = sevenz_rust2::Archive::open(path).map_err(|e| corrupt(path, e))?;

    Ok(archive
        .files
        .iter()
        .map(|f| ArchiveEntry {
            path: to_linux_path(f.name()),
            size: f.size(),
            is_dir: f.is_directory(),
        })
        .collect())
}

fn visit_7z(path: &Path, visit: &mut EntryVisitor<'_>) -> Result<(), ArchiveError> {
    let mut reader = sevenz_rust2::ArchiveReader::open(path, sevenz_rust2::Password::empty())
        .map_err(|e| corrupt(path, e))?;

    // The 7z callback can only return its own error type, so ours is parked
    // here and the walk is stopped.
    let mut failure: Option<ArchiveError> = None;

    reader
        .for_each_entries(|entry, entry_reader| {
            if entry.is_directory() {
                return Ok(true);
            }
            let name = to_linux_path(entry.name());
            match visit(&name, entry_reader) {
                Ok(keep_going) => Ok(keep_going),
                Err(e) => {
                    failure = Some(e);
                    Ok(false)
                }
            }
        })
        .map_err(|e| corrupt(path, e))?;

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// RAR
// ---------------------------------------------------------------------------

fn list_rar(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let archive = unrar::Archive::new(path)
        .open_for_listing()
        .map_err(|e| corrupt(path, e))?;

    let mut entries = Vec::new();
    for header in archive {
        let header = header.map_err(|e| corrupt(path, e))?;
        entries.push(ArchiveEntry {
            path: to_linux_path(&header.filename.to_string_lossy()),
            size: header.unpacked_size,
            is_dir: header.is_directory(),
        });
    }

    Ok(entries)
}

fn visit_rar(path: &Path, visit: &mut EntryVisitor<'_>) -> Result<(), ArchiveError> {
    let mut archive = unrar::Archive::new(path)
        .open_for_processing()
        .map_err(|e| corrupt(path, e))?;

    while let Some(header) = archive.read_header().map_err(|e| corrupt(path, e))? {
        if header.entry().is_file() {
            let name = to_linux_path(&header.entry().filename.to_string_lossy());
            let (data, next) = header.read().map_err(|e| corrupt(path, e))?;
            if !visit(&name, &mut Cursor::new(data))? {
                break;
            }
            archive = next;
        } else {
            archive = header.skip().map_err(|e| corrupt(path, e))?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// TAR (plain, gzip, zstd, xz, bzip2)
// ---------------------------------------------------------------------------

fn open_tar(path: &Path, kind: ArchiveType) -> Result<tar::Archive<Box<dyn Read>>, ArchiveError> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = match kind {
        ArchiveType::TarGz => Box::new(flate2::read::GzDecoder::new(BufReader::new(file))),
        ArchiveType::TarZst => Box::new(zstd::stream::read::Decoder::new(file)?),
        ArchiveType::TarXz => Box::new(lzma_rust2::XzReader::new(BufReader::new(file), true)),
        ArchiveType::TarBz2 => Box::new(bzip2::read::MultiBzDecoder::new(BufReader::new(file))),
        _ => Box::new(BufReader::new(file)),
    };
    Ok(tar::Archive::new(reader))
}

fn list_tar(path: &Path, kind: ArchiveType) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut archive = open_tar(path, kind)?;
    let mut entries = Vec::new();

    for entry in archive.entries().map_err(|e| corrupt(path, e))? {
        let entry = entry.map_err(|e| corrupt(path, e))?;
        let entry_type = entry.header().entry_type();
        if !entry_type.is_file() && !entry_type.is_dir() {
            // Links and special files are never extracted
            continue;
        }
        let entry_path = entry.path().map_err(|e| corrupt(path, e))?;
        entries.push(ArchiveEntry {
            path: to_linux_path(&entry_path.to_string_lossy()),
            size: entry.size(),
            is_dir: entry_type.is_dir(),
        });
    }

    Ok(entries)
}

fn visit_tar(
    path: &Path,
    kind: ArchiveType,
    visit: &mut EntryVisitor<'_>,
) -> Result<(), ArchiveError> {
    let mut archive = open_tar(path, kind)?;

    for entry in archive.entries().map_err(|e| corrupt(path, e))? {
        let mut entry = entry.map_err(|e| corrupt(path, e))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = to_linux_path(&entry.path().map_err(|e| corrupt(path, e))?.to_string_lossy());
        if !visit(&name, &mut entry)? {
            break;
        }
    }

    Ok(())
}

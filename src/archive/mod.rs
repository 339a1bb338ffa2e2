//! Archive inspection and extraction.
//!
//! Mod archives come as ZIP (zip crate), 7z (sevenz-rust2), RAR (unrar) or
//! tar, optionally gzip or zstd compressed (tar + flate2 / zstd).
//!
//! Extraction always goes through an [`ExtractionPlan`]: when every file in
//! the archive sits below the same top-level folder, that folder is stripped
//! so the mod contents land directly in the mod directory.

mod formats;

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::paths;

/// Archive type detected by magic bytes, falling back to the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    /// ZIP archive (PK signature)
    Zip,
    /// 7z archive (7z signature)
    SevenZ,
    /// RAR archive (Rar! signature)
    Rar,
    /// Uncompressed tar
    Tar,
    /// gzip compressed tar
    TarGz,
    /// zstd compressed tar
    TarZst,
    /// xz compressed tar
    TarXz,
    /// bzip2 compressed tar
    TarBz2,
}

impl ArchiveType {
    /// Guess the archive type from a file name only
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            return Some(ArchiveType::TarGz);
        }
        if lower.ends_with(".tar.zst") || lower.ends_with(".tzst") {
            return Some(ArchiveType::TarZst);
        }
        if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
            return Some(ArchiveType::TarXz);
        }
        if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") || lower.ends_with(".tbz") {
            return Some(ArchiveType::TarBz2);
        }
        match paths::extension(&lower)? {
            "zip" => Some(ArchiveType::Zip),
            "7z" => Some(ArchiveType::SevenZ),
            "rar" => Some(ArchiveType::Rar),
            "tar" => Some(ArchiveType::Tar),
            _ => None,
        }
    }
}

/// Errors raised while reading an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Unsupported archive format: {0}")]
    Unsupported(PathBuf),

    #[error("Corrupt archive {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Extraction cancelled")]
    Cancelled,
}

/// Information about an entry in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path within the archive (forward slashes, case-preserved)
    pub path: String,
    /// Uncompressed size in bytes
    pub size: u64,
    /// Whether this is a directory
    pub is_dir: bool,
}

/// Whether a downloaded file should be treated as an archive
pub fn is_archive_file(name: &str) -> bool {
    ArchiveType::from_file_name(name).is_some()
}

/// Detect archive type by reading magic bytes.
///
/// Magic bytes win over the extension so a mislabeled `.zip` that is really
/// a RAR still opens. Plain tar has no magic at offset 0, so it is recognised
/// by the `ustar` marker or by its extension.
pub fn detect_archive_type(path: &Path) -> Result<ArchiveType, ArchiveError> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 262];
    let bytes_read = read_up_to(&mut file, &mut magic)?;
    let magic = &magic[..bytes_read];

    if magic.starts_with(&[0x50, 0x4B]) {
        return Ok(ArchiveType::Zip);
    }
    if magic.starts_with(&[0x52, 0x61, 0x72, 0x21]) {
        return Ok(ArchiveType::Rar);
    }
    if magic.starts_with(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]) {
        return Ok(ArchiveType::SevenZ);
    }
    if magic.starts_with(&[0x1F, 0x8B]) {
        return Ok(ArchiveType::TarGz);
    }
    if magic.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
        return Ok(ArchiveType::TarZst);
    }
    if magic.starts_with(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]) {
        return Ok(ArchiveType::TarXz);
    }
    if magic.starts_with(b"BZh") {
        return Ok(ArchiveType::TarBz2);
    }
    if magic.len() >= 262 && &magic[257..262] == b"ustar" {
        return Ok(ArchiveType::Tar);
    }

    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    ArchiveType::from_file_name(&name).ok_or_else(|| ArchiveError::Unsupported(path.to_path_buf()))
}

fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// List all entries (files and directories) in an archive.
pub fn list_entries(archive_path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let kind = detect_archive_type(archive_path)?;
    formats::list(archive_path, kind)
}

/// The single top-level folder shared by every path, if there is one.
///
/// A path without a separator is a file at the archive root, which rules
/// stripping out entirely. An empty input has no root.
pub fn common_root<'a, I>(paths: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut root: Option<&str> = None;

    for path in paths {
        let path = path.trim_start_matches('/');
        let (first, _) = path.split_once('/')?;
        match root {
            None => root = Some(first),
            Some(existing) if existing == first => {}
            Some(_) => return None,
        }
    }

    root.filter(|r| !r.is_empty()).map(str::to_string)
}

/// Which files get extracted and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    /// Non-directory entries in archive order
    pub files: Vec<ArchiveEntry>,
    /// Top-level folder removed from every destination path
    pub strip_root: Option<String>,
}

impl ExtractionPlan {
    /// Build a plan from a full entry listing
    pub fn from_entries(entries: Vec<ArchiveEntry>) -> Self {
        let files: Vec<ArchiveEntry> = entries.into_iter().filter(|e| !e.is_dir).collect();
        let strip_root = common_root(files.iter().map(|e| e.path.as_str()));
        Self { files, strip_root }
    }

    /// Number of files the plan will write
    pub fn total(&self) -> usize {
        self.files.len()
    }

    /// Destination of an entry relative to the extraction directory.
    ///
    /// `None` means the entry must be skipped (it would land outside the
    /// extraction directory).
    pub fn destination_for(&self, entry_path: &str) -> Option<PathBuf> {
        let normalized = paths::to_linux_path(entry_path);
        let normalized = normalized.trim_start_matches('/');
        let relative = match &self.strip_root {
            Some(root) => normalized
                .strip_prefix(root.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(normalized),
            None => normalized,
        };
        paths::safe_relative_path(relative)
    }
}

/// Inspect an archive and compute its extraction plan.
pub fn plan_extraction(archive_path: &Path) -> Result<ExtractionPlan, ArchiveError> {
    Ok(ExtractionPlan::from_entries(list_entries(archive_path)?))
}

/// Progress callback for extraction: (entries processed, entries total)
pub type EntryProgress<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Summary of a finished extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Files written to disk
    pub files_written: usize,
    /// Entries skipped because their path was unsafe
    pub files_skipped: usize,
    /// Folder that was stripped from every path
    pub stripped_root: Option<String>,
}

/// Extract every file of an archive into `output_dir`, stripping the common
/// root folder when there is one.
///
/// Existing files are overwritten. Progress is reported after each entry.
/// When a cancellation token is given it is checked before each entry; a
/// cancelled extraction leaves already written files in place.
pub fn extract_archive(
    archive_path: &Path,
    output_dir: &Path,
    progress: Option<EntryProgress<'_>>,
    cancel: Option<&CancellationToken>,
) -> Result<ExtractSummary, ArchiveError> {
    extract_archive_with(archive_path, output_dir, true, progress, cancel)
}

/// Like [`extract_archive`], but with root stripping optional. Bundles that
/// lay out several top-level folders on purpose are extracted verbatim.
pub fn extract_archive_with(
    archive_path: &Path,
    output_dir: &Path,
    strip_root: bool,
    progress: Option<EntryProgress<'_>>,
    cancel: Option<&CancellationToken>,
) -> Result<ExtractSummary, ArchiveError> {
    let kind = detect_archive_type(archive_path)?;
    let mut plan = ExtractionPlan::from_entries(formats::list(archive_path, kind)?);
    if !strip_root {
        plan.strip_root = None;
    }
    let total = plan.total();

    debug!(
        "Extracting {} ({:?}, {} files, root: {:?}) into {}",
        archive_path.display(),
        kind,
        total,
        plan.strip_root,
        output_dir.display()
    );

    fs::create_dir_all(output_dir)?;

    let mut summary = ExtractSummary {
        stripped_root: plan.strip_root.clone(),
        ..Default::default()
    };
    let mut processed = 0usize;

    let mut visit = |name: &str, reader: &mut dyn Read| -> Result<bool, ArchiveError> {
        if cancel.is_some_and(|token| token.is_cancelled()) {
            return Err(ArchiveError::Cancelled);
        }

        match plan.destination_for(name) {
            Some(relative) => {
                let dest = output_dir.join(relative);
                paths::ensure_parent_dirs(&dest)?;
                let mut out = File::create(&dest)?;
                io::copy(reader, &mut out)?;
                summary.files_written += 1;
            }
            None => {
                warn!("Skipping unsafe archive entry: {}", name);
                summary.files_skipped += 1;
            }
        }

        processed += 1;
        if let Some(report) = progress {
            report(processed, total);
        }
        Ok(true)
    };

    formats::visit_files(archive_path, kind, &mut visit)?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tar_bytes, write_7z, write_zip};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const RAR_FIXTURE: &[u8] = include_bytes!("testdata/version.rar");

    fn entry(path: &str) -> ArchiveEntry {
        ArchiveEntry {
            path: path.to_string(),
            size: 0,
            is_dir: false,
        }
    }

    #[test]
    fn test_common_root_shared_folder() {
        let root = common_root(["Root/tex.dds", "Root/sub/mesh.bin"]);
        assert_eq!(root.as_deref(), Some("Root"));
    }

    #[test]
    fn test_common_root_file_at_top_disqualifies() {
        assert_eq!(common_root(["Root/tex.dds", "readme.txt"]), None);
        assert_eq!(common_root(["readme.txt", "Root/tex.dds"]), None);
    }

    #[test]
    fn test_common_root_different_folders() {
        assert_eq!(common_root(["A/tex.dds", "B/tex.dds"]), None);
    }

    #[test]
    fn test_common_root_empty() {
        assert_eq!(common_root(Vec::<&str>::new()), None);
    }

    #[test]
    fn test_plan_ignores_directories() {
        let plan = ExtractionPlan::from_entries(vec![
            ArchiveEntry {
                path: "Root/".into(),
                size: 0,
                is_dir: true,
            },
            entry("Root/a.ini"),
            entry("Root/b/c.buf"),
        ]);
        assert_eq!(plan.total(), 2);
        assert_eq!(plan.strip_root.as_deref(), Some("Root"));
        assert_eq!(plan.destination_for("Root/a.ini"), Some(PathBuf::from("a.ini")));
        assert_eq!(plan.destination_for("Root/b/c.buf"), Some(PathBuf::from("b/c.buf")));
    }

    #[test]
    fn test_plan_without_root_keeps_paths() {
        let plan = ExtractionPlan::from_entries(vec![entry("a.ini"), entry("Root/b.buf")]);
        assert_eq!(plan.strip_root, None);
        assert_eq!(plan.destination_for("Root/b.buf"), Some(PathBuf::from("Root/b.buf")));
    }

    #[test]
    fn test_plan_rejects_traversal() {
        let plan = ExtractionPlan::from_entries(vec![entry("../evil.dll"), entry("ok.ini")]);
        assert_eq!(plan.destination_for("../evil.dll"), None);
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(ArchiveType::from_file_name("mod.ZIP"), Some(ArchiveType::Zip));
        assert_eq!(ArchiveType::from_file_name("mod.7z"), Some(ArchiveType::SevenZ));
        assert_eq!(ArchiveType::from_file_name("mod.rar"), Some(ArchiveType::Rar));
        assert_eq!(ArchiveType::from_file_name("mod.tgz"), Some(ArchiveType::TarGz));
        assert_eq!(ArchiveType::from_file_name("mod.tar.zst"), Some(ArchiveType::TarZst));
        assert_eq!(ArchiveType::from_file_name("mod.tar.xz"), Some(ArchiveType::TarXz));
        assert_eq!(ArchiveType::from_file_name("mod.TXZ"), Some(ArchiveType::TarXz));
        assert_eq!(ArchiveType::from_file_name("mod.tar.bz2"), Some(ArchiveType::TarBz2));
        assert_eq!(ArchiveType::from_file_name("mod.tbz2"), Some(ArchiveType::TarBz2));
        assert_eq!(ArchiveType::from_file_name("mod.dds"), None);
        assert!(is_archive_file("pack.tar"));
        assert!(!is_archive_file("preview.png"));
    }

    #[test]
    fn test_detect_zip_by_magic() -> anyhow::Result<()> {
        let dir = tempdir()?;
        // Mislabeled on purpose
        let path = dir.path().join("mod.rar");
        write_zip(&path, &[("a.txt", b"a")]);
        assert_eq!(detect_archive_type(&path)?, ArchiveType::Zip);
        Ok(())
    }

    #[test]
    fn test_detect_unknown_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"just text")?;
        assert!(matches!(
            detect_archive_type(&path),
            Err(ArchiveError::Unsupported(_))
        ));
        Ok(())
    }

    #[test]
    fn test_extract_zip_strips_root() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let zip_path = dir.path().join("mod.zip");
        let out = dir.path().join("out");
        write_zip(
            &zip_path,
            &[("Root/tex.dds", b"texture"), ("Root/sub/mesh.bin", b"mesh")],
        );

        let seen = AtomicUsize::new(0);
        let progress = |done: usize, total: usize| {
            assert_eq!(total, 2);
            seen.store(done, Ordering::SeqCst);
        };
        let progress_ref: EntryProgress<'_> = &progress;
        let summary = extract_archive(&zip_path, &out, Some(progress_ref), None)?;

        assert_eq!(summary.files_written, 2);
        assert_eq!(summary.stripped_root.as_deref(), Some("Root"));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(fs::read(out.join("tex.dds"))?, b"texture");
        assert_eq!(fs::read(out.join("sub/mesh.bin"))?, b"mesh");
        assert!(!out.join("Root").exists());
        Ok(())
    }

    #[test]
    fn test_extract_without_stripping_keeps_root() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let zip_path = dir.path().join("pack.zip");
        let out = dir.path().join("out");
        write_zip(&zip_path, &[("Characters/Ellen/mod.ini", b"ini")]);

        let summary = extract_archive_with(&zip_path, &out, false, None, None)?;

        assert_eq!(summary.stripped_root, None);
        assert!(out.join("Characters/Ellen/mod.ini").exists());
        Ok(())
    }

    #[test]
    fn test_extract_zip_mixed_root_is_verbatim() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let zip_path = dir.path().join("mod.zip");
        let out = dir.path().join("out");
        write_zip(&zip_path, &[("Root/tex.dds", b"t"), ("readme.txt", b"r")]);

        let summary = extract_archive(&zip_path, &out, None, None)?;

        assert_eq!(summary.stripped_root, None);
        assert!(out.join("Root/tex.dds").exists());
        assert!(out.join("readme.txt").exists());
        Ok(())
    }

    #[test]
    fn test_extract_overwrites_existing() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let zip_path = dir.path().join("mod.zip");
        let out = dir.path().join("out");
        fs::create_dir_all(&out)?;
        fs::write(out.join("a.ini"), b"old contents that are longer")?;
        write_zip(&zip_path, &[("a.ini", b"new")]);

        extract_archive(&zip_path, &out, None, None)?;

        assert_eq!(fs::read(out.join("a.ini"))?, b"new");
        Ok(())
    }

    #[test]
    fn test_extract_tar_gz() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("pack.tar.gz");
        let out = dir.path().join("out");

        {
            let file = File::create(&archive_path)?;
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            for (name, data) in [("Pack/a.ini", &b"aa"[..]), ("Pack/b/c.ib", &b"ccc"[..])] {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append_data(&mut header, name, data)?;
            }
            builder.into_inner()?.finish()?;
        }

        assert_eq!(detect_archive_type(&archive_path)?, ArchiveType::TarGz);
        let summary = extract_archive(&archive_path, &out, None, None)?;

        assert_eq!(summary.files_written, 2);
        assert_eq!(fs::read(out.join("a.ini"))?, b"aa");
        assert_eq!(fs::read(out.join("b/c.ib"))?, b"ccc");
        Ok(())
    }

    #[test]
    fn test_extract_plain_tar_lists_entries() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("pack.tar");

        {
            let file = File::create(&archive_path)?;
            let mut builder = tar::Builder::new(file);
            let data = b"hello";
            let mut header = tar::Header::new_ustar();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "hello.txt", &data[..])?;
            builder.finish()?;
        }

        let entries = list_entries(&archive_path)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "hello.txt");
        assert_eq!(entries[0].size, 5);
        Ok(())
    }

    #[test]
    fn test_extract_cancelled_before_first_entry() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let zip_path = dir.path().join("mod.zip");
        let out = dir.path().join("out");
        write_zip(&zip_path, &[("a.ini", b"a")]);

        let token = CancellationToken::new();
        token.cancel();
        let result = extract_archive(&zip_path, &out, None, Some(&token));

        assert!(matches!(result, Err(ArchiveError::Cancelled)));
        assert!(!out.join("a.ini").exists());
        Ok(())
    }

    #[test]
    fn test_corrupt_zip_fails() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.zip");
        fs::write(&path, b"PK\x03\x04 definitely not a zip")?;
        let result = extract_archive(&path, &dir.path().join("out"), None, None);
        assert!(matches!(result, Err(ArchiveError::Corrupt { .. })));
        Ok(())
    }

    #[test]
    fn test_extract_tar_zst() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("pack.tar.zst");
        let out = dir.path().join("out");

        let mut encoder = zstd::stream::write::Encoder::new(File::create(&archive_path)?, 0)?;
        encoder.write_all(&tar_bytes(&[("Pack/a.ini", b"zst"), ("Pack/b/c.ib", b"c")]))?;
        encoder.finish()?;

        assert_eq!(detect_archive_type(&archive_path)?, ArchiveType::TarZst);
        let summary = extract_archive(&archive_path, &out, None, None)?;

        assert_eq!(summary.stripped_root.as_deref(), Some("Pack"));
        assert_eq!(fs::read(out.join("a.ini"))?, b"zst");
        assert_eq!(fs::read(out.join("b/c.ib"))?, b"c");
        Ok(())
    }

    #[test]
    fn test_extract_tar_xz() -> anyhow::Result<()> {
        let dir = tempdir()?;
        // No extension, so detection has to come from the xz magic
        let archive_path = dir.path().join("download");
        let out = dir.path().join("out");

        let options = lzma_rust2::XzOptions::with_preset(6);
        let mut writer = lzma_rust2::XzWriter::new(File::create(&archive_path)?, options)?;
        writer.write_all(&tar_bytes(&[("Pack/a.ini", b"xz")]))?;
        writer.finish()?;

        assert_eq!(detect_archive_type(&archive_path)?, ArchiveType::TarXz);
        let summary = extract_archive(&archive_path, &out, None, None)?;

        assert_eq!(summary.files_written, 1);
        assert_eq!(fs::read(out.join("a.ini"))?, b"xz");
        Ok(())
    }

    #[test]
    fn test_extract_tar_bz2() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("download");
        let out = dir.path().join("out");

        let file = File::create(&archive_path)?;
        let mut encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
        encoder.write_all(&tar_bytes(&[("a.ini", b"bz"), ("Tex/b.dds", b"dds")]))?;
        encoder.finish()?;

        assert_eq!(detect_archive_type(&archive_path)?, ArchiveType::TarBz2);
        let summary = extract_archive(&archive_path, &out, None, None)?;

        assert_eq!(summary.stripped_root, None);
        assert_eq!(fs::read(out.join("a.ini"))?, b"bz");
        assert_eq!(fs::read(out.join("Tex/b.dds"))?, b"dds");
        Ok(())
    }

    #[test]
    fn test_extract_7z_strips_root() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("mod.7z");
        let out = dir.path().join("out");
        write_7z(
            &archive_path,
            &[("Root/mod.ini", b"ini"), ("Root/tex/body.dds", b"dds")],
        );

        assert_eq!(detect_archive_type(&archive_path)?, ArchiveType::SevenZ);
        let summary = extract_archive(&archive_path, &out, None, None)?;

        assert_eq!(summary.files_written, 2);
        assert_eq!(summary.stripped_root.as_deref(), Some("Root"));
        assert_eq!(fs::read(out.join("mod.ini"))?, b"ini");
        assert_eq!(fs::read(out.join("tex/body.dds"))?, b"dds");
        assert!(!out.join("Root").exists());
        Ok(())
    }

    #[test]
    fn test_extract_7z_cancelled_mid_archive() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("mod.7z");
        let out = dir.path().join("out");
        write_7z(
            &archive_path,
            &[("a.ini", b"a"), ("b.ini", b"b"), ("c.ini", b"c")],
        );

        let token = CancellationToken::new();
        let cancel_after_first = |done: usize, _total: usize| {
            if done == 1 {
                token.cancel();
            }
        };
        let progress_ref: EntryProgress<'_> = &cancel_after_first;
        let result = extract_archive(&archive_path, &out, Some(progress_ref), Some(&token));

        assert!(matches!(result, Err(ArchiveError::Cancelled)));
        assert!(out.join("a.ini").exists());
        assert!(!out.join("b.ini").exists());
        assert!(!out.join("c.ini").exists());
        Ok(())
    }

    #[test]
    fn test_extract_rar() -> anyhow::Result<()> {
        let dir = tempdir()?;
        // Mislabeled on purpose
        let archive_path = dir.path().join("mod.zip");
        let out = dir.path().join("out");
        fs::write(&archive_path, RAR_FIXTURE)?;

        assert_eq!(detect_archive_type(&archive_path)?, ArchiveType::Rar);
        let entries = list_entries(&archive_path)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "VERSION");

        let summary = extract_archive(&archive_path, &out, None, None)?;
        assert_eq!(summary.files_written, 1);
        assert_eq!(summary.stripped_root, None);
        assert_eq!(fs::read(out.join("VERSION"))?, b"unrar-0.4.0");
        Ok(())
    }
}

//! Preview images for installed mods.
//!
//! Screenshots from the catalog are stored next to the mod as
//! `preview001.jpg`, `preview002.png`, ... In replace mode the old previews
//! (and the `minitile.jpg` generated from them) go first; in combine mode
//! the new images continue after the highest existing number.

use std::fs;
use std::path::Path;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::catalog::PreviewImage;
use crate::downloaders::{fetch_bytes, HttpClient};
use crate::paths::is_preview_file;

/// How new previews relate to existing ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewMode {
    Replace,
    Combine,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewReport {
    pub downloaded: usize,
    pub failed: usize,
    pub removed: usize,
}

/// Delete preview images and `minitile.jpg` from the top level of a mod
/// folder. Returns how many files were removed.
pub fn remove_existing_previews(mod_dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(mod_dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_preview_file(&name) || !entry.path().is_file() {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to delete preview {}: {}", entry.path().display(), e),
        }
    }
    removed
}

/// Highest number among `preview-?N` files; a bare `preview.jpg` counts as 0
pub fn highest_preview_index(mod_dir: &Path) -> u32 {
    let Ok(re) = Regex::new(r"(?i)^preview-?(\d+)") else {
        return 0;
    };
    let Ok(entries) = fs::read_dir(mod_dir) else {
        return 0;
    };

    entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| is_preview_file(name))
        .filter_map(|name| {
            re.captures(&name)
                .and_then(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        })
        .max()
        .unwrap_or(0)
}

/// `preview007.png`
pub fn preview_file_name(index: u32, extension: &str) -> String {
    format!("preview{:03}{}", index, extension)
}

/// Download the screenshot images of a mod into its folder.
///
/// Individual failures are logged and counted. Cancellation stops before
/// the next image.
pub async fn fetch_previews(
    client: &HttpClient,
    mod_dir: &Path,
    images: &[PreviewImage],
    mode: PreviewMode,
    cancel: &CancellationToken,
) -> PreviewReport {
    let mut report = PreviewReport::default();

    let screenshots: Vec<&PreviewImage> = images.iter().filter(|i| i.is_screenshot()).collect();
    if screenshots.is_empty() {
        debug!("No screenshots to download for {}", mod_dir.display());
        return report;
    }

    let start = match mode {
        PreviewMode::Replace => {
            report.removed = remove_existing_previews(mod_dir);
            1
        }
        PreviewMode::Combine => highest_preview_index(mod_dir) + 1,
    };

    for (offset, image) in screenshots.into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        let name = preview_file_name(start + offset as u32, &image.extension());
        let bytes = match fetch_bytes(client, &image.url, cancel).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_cancelled() => break,
            Err(e) => {
                warn!("Failed to download preview {}: {}", image.url, e);
                report.failed += 1;
                continue;
            }
        };

        match tokio::fs::write(mod_dir.join(&name), &bytes).await {
            Ok(()) => {
                debug!("Downloaded preview {}", name);
                report.downloaded += 1;
            }
            Err(e) => {
                warn!("Failed to write preview {}: {}", name, e);
                report.failed += 1;
            }
        }
    }

    report
}

//! Download handlers
//!
//! Everything the installer fetches (mod files, starter packs, preview
//! images) is a plain HTTP GET against a URL handed out by the catalog.

mod http;

pub use http::{download_file, fetch_bytes, HttpClient, PercentCallback};

use std::path::PathBuf;
use thiserror::Error;

/// One file to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub destination: PathBuf,
    /// Size announced by the catalog, used when the server sends no length
    pub expected_size: Option<u64>,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            expected_size: None,
        }
    }

    pub fn with_expected_size(mut self, size: u64) -> Self {
        self.expected_size = (size > 0).then_some(size);
        self
    }
}

/// Download failures.
///
/// `Cancelled` is kept apart from the rest so callers can reset quietly
/// instead of reporting an error.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP {status} - {url}")]
    Http { status: u16, url: String },

    #[error("Connection failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to write download: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download cancelled")]
    Cancelled,
}

impl DownloadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled)
    }
}

/// Truncate URL for error messages
pub(crate) fn truncate_url(url: &str) -> String {
    if url.chars().count() > 80 {
        let head: String = url.chars().take(77).collect();
        format!("{}...", head)
    } else {
        url.to_string()
    }
}

//! Remote mod catalog.
//!
//! The installer only needs a handful of lookups from the catalog: mod
//! details (for the version and preview images), the file list of a mod or
//! tool, and paged browsing. They sit behind [`ModCatalog`] so the pipeline
//! can run against the real GameBanana API or an in-memory fake.

mod gamebanana;

pub use gamebanana::{GameBananaClient, API_BASE_URL};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A downloadable file attached to a mod or tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModFile {
    #[serde(rename = "_idRow", default)]
    pub id: u64,
    #[serde(rename = "_sFile", default)]
    pub file_name: String,
    #[serde(rename = "_nFilesize", default)]
    pub file_size: u64,
    #[serde(rename = "_sDescription", default)]
    pub description: Option<String>,
    #[serde(rename = "_sDownloadUrl", default)]
    pub download_url: String,
    #[serde(rename = "_nDownloadCount", default)]
    pub download_count: u64,
    /// Unix timestamp
    #[serde(rename = "_tsDateAdded", default)]
    pub date_added: i64,
}

/// One image from a mod's preview gallery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    /// Gallery type as reported by the catalog (`screenshot`, ...)
    pub kind: String,
    pub url: String,
}

impl PreviewImage {
    pub fn screenshot(url: impl Into<String>) -> Self {
        Self {
            kind: "screenshot".to_string(),
            url: url.into(),
        }
    }

    pub fn is_screenshot(&self) -> bool {
        self.kind.eq_ignore_ascii_case("screenshot")
    }

    /// Extension of the image file including the dot, `.jpg` when unknown
    pub fn extension(&self) -> String {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        let name = crate::paths::file_name(path);
        match crate::paths::extension(name) {
            Some(ext) if !ext.is_empty() && ext.len() <= 4 => format!(".{}", ext.to_lowercase()),
            _ => ".jpg".to_string(),
        }
    }
}

/// Mod details as far as the installer cares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModRecord {
    pub id: u64,
    pub name: String,
    pub author: Option<String>,
    pub profile_url: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub preview_images: Vec<PreviewImage>,
    pub date_updated: Option<NaiveDate>,
    /// Mod carries content ratings (shown as NSFW)
    pub is_nsfw: bool,
}

/// One page of a browse listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModListPage {
    pub records: Vec<ModRecord>,
    pub record_count: u64,
    pub is_complete: bool,
}

/// Listing order for browsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModSort {
    #[default]
    Default,
    /// Newest first
    New,
    /// Most recently updated first
    Updated,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Catalog request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected catalog response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unknown game tag: {0}")]
    UnknownGame(String),

    #[error("{0} is not available (private or removed)")]
    Unavailable(String),
}

/// Read access to the remote catalog
#[async_trait]
pub trait ModCatalog: Send + Sync {
    async fn mod_details(&self, mod_id: u64) -> Result<ModRecord, CatalogError>;

    async fn mod_files(&self, mod_id: u64) -> Result<Vec<ModFile>, CatalogError>;

    async fn list_mods(
        &self,
        game_tag: &str,
        page: u32,
        sort: ModSort,
    ) -> Result<ModListPage, CatalogError>;

    async fn tool_files(&self, tool_id: u64) -> Result<Vec<ModFile>, CatalogError>;
}

/// Numeric mod id from a GameBanana page URL
/// (`https://gamebanana.com/mods/123456` -> `123456`)
pub fn mod_id_from_url(url: &str) -> Option<u64> {
    let re = Regex::new(r"gamebanana\.com/mods/(\d+)").ok()?;
    re.captures(url)?.get(1)?.as_str().parse().ok()
}

/// Convert a catalog timestamp to a calendar date (UTC)
pub(crate) fn date_from_timestamp(ts: i64) -> Option<NaiveDate> {
    (ts > 0)
        .then(|| DateTime::from_timestamp(ts, 0))
        .flatten()
        .map(|dt| dt.date_naive())
}

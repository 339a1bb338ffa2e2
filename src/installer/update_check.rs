//! Update check for an installed mod
//!
//! Compares the catalog's last-update date with the `dateUpdated` stored in
//! the mod's `mod.json`. Both sides are calendar dates, so a remote update
//! on the same day as the install does not count.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use crate::catalog::{mod_id_from_url, CatalogError, ModCatalog};
use crate::metadata;

/// Result of comparing an installed mod with its catalog page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The catalog copy was updated after the installed one
    Available {
        installed: NaiveDate,
        remote: NaiveDate,
    },
    UpToDate {
        installed: NaiveDate,
        remote: NaiveDate,
    },
    /// No usable record, URL or date on one of the two sides
    Unknown,
}

impl UpdateStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, UpdateStatus::Available { .. })
    }
}

/// Check whether the mod installed in `mod_dir` has a newer catalog version.
///
/// A missing or malformed `mod.json`, a record without a catalog URL, or an
/// unset (`0000-00-00`) local date all yield [`UpdateStatus::Unknown`]
/// without contacting the catalog. Catalog failures are returned.
pub async fn check_for_update(
    mod_dir: &Path,
    catalog: &dyn ModCatalog,
) -> Result<UpdateStatus, CatalogError> {
    let Some(meta) = metadata::read_metadata(mod_dir) else {
        debug!("{}: no readable mod.json", mod_dir.display());
        return Ok(UpdateStatus::Unknown);
    };
    let Some(mod_id) = meta.url.as_deref().and_then(mod_id_from_url) else {
        debug!("{}: no catalog url", mod_dir.display());
        return Ok(UpdateStatus::Unknown);
    };
    let Some(installed) = meta.date_updated() else {
        debug!("{}: dateUpdated not set", mod_dir.display());
        return Ok(UpdateStatus::Unknown);
    };

    let record = catalog.mod_details(mod_id).await?;
    let Some(remote) = record.date_updated else {
        return Ok(UpdateStatus::Unknown);
    };

    debug!("Mod {}: installed {}, remote {}", mod_id, installed, remote);
    if remote > installed {
        Ok(UpdateStatus::Available { installed, remote })
    } else {
        Ok(UpdateStatus::UpToDate { installed, remote })
    }
}

/// Mod folders of a library that carry a `mod.json`, either directly in a
/// category (`Characters/Ellen`) or at the top level. Sorted by path.
pub fn installed_mods(mods_root: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = walkdir::WalkDir::new(mods_root)
        .min_depth(1)
        .max_depth(2)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| entry.path().join(metadata::MOD_JSON).is_file())
        .map(walkdir::DirEntry::into_path)
        .collect();
    found.sort();
    found
}

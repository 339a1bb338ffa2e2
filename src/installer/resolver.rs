//! Decide where a mod gets installed.
//!
//! A mod is identified inside its category by its logical name, no matter
//! whether the folder currently carries the `DISABLED_` marker. New installs
//! always start disabled so the user can review them before activating.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::metadata::read_metadata;
use crate::paths::{disabled_name, sanitize_mod_name};

/// Where an install will land
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationTarget {
    pub category_dir: PathBuf,
    /// Folder name without the disabled marker
    pub logical_name: String,
    pub resolved_path: PathBuf,
    /// Installing over an existing copy of the same mod
    pub is_update: bool,
}

/// Installed folders for a logical name, enabled spelling first
pub fn existing_installs(category_dir: &Path, name: &str) -> Vec<PathBuf> {
    [category_dir.join(name), category_dir.join(disabled_name(name))]
        .into_iter()
        .filter(|dir| dir.is_dir())
        .collect()
}

/// Resolve the target for a single-archive install.
///
/// An existing folder is only reused when its `mod.json` points at the same
/// source URL. When both the enabled and the disabled folder exist, whichever
/// matches wins (the enabled one if both do). Anything else (other URL, no
/// URL, unreadable record) gets a fresh suffixed folder next to them.
pub fn resolve_target(
    category_dir: &Path,
    mod_name: &str,
    source_url: &str,
) -> InstallationTarget {
    let name = sanitize_mod_name(mod_name);

    let candidates = existing_installs(category_dir, &name);
    if candidates.is_empty() {
        return new_target(category_dir, name);
    }

    let matching = candidates.iter().find(|dir| {
        let stored_url = read_metadata(dir).and_then(|meta| meta.url);
        stored_url.as_deref().map(str::trim) == Some(source_url.trim())
    });
    if let Some(existing) = matching {
        debug!("Updating existing install at {}", existing.display());
        return InstallationTarget {
            category_dir: category_dir.to_path_buf(),
            logical_name: name,
            resolved_path: existing.clone(),
            is_update: true,
        };
    }

    debug!("{:?} hold a different source, installing alongside", candidates);
    new_target(category_dir, first_free_suffix(category_dir, &name))
}

/// A fresh container for a multi-file install. Never an update.
pub fn unique_container(category_dir: &Path, name: &str) -> InstallationTarget {
    let name = sanitize_mod_name(name);
    if name_is_taken(category_dir, &name) {
        new_target(category_dir, first_free_suffix(category_dir, &name))
    } else {
        new_target(category_dir, name)
    }
}

fn new_target(category_dir: &Path, logical_name: String) -> InstallationTarget {
    InstallationTarget {
        category_dir: category_dir.to_path_buf(),
        resolved_path: category_dir.join(disabled_name(&logical_name)),
        logical_name,
        is_update: false,
    }
}

fn name_is_taken(category_dir: &Path, name: &str) -> bool {
    category_dir.join(name).exists() || category_dir.join(disabled_name(name)).exists()
}

/// `name_1`, `name_2`, ... whichever is free in both spellings first
fn first_free_suffix(category_dir: &Path, name: &str) -> String {
    let mut n = 1u32;
    loop {
        let candidate = format!("{}_{}", name, n);
        if !name_is_taken(category_dir, &candidate) {
            return candidate;
        }
        n += 1;
    }
}

//! Mod directory naming and archive path helpers
//!
//! Mod folders live in `<mods root>/<category>/<name>`. An inactive mod keeps
//! the same folder with a `DISABLED_` prefix, so every lookup by logical name
//! has to consider both spellings.
//! Archive entries may come with Windows separators and are normalized to `/`
//! before any path logic runs.

use std::path::{Component, Path, PathBuf};

/// Directory prefix marking an installed but inactive mod
pub const DISABLED_PREFIX: &str = "DISABLED_";

/// Characters that are never valid in a file or directory name on Windows,
/// which is the strictest platform mod folders get synced to.
const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a mod name safe to use as a directory name.
///
/// Every invalid character becomes `_` and trailing periods are trimmed.
/// Applying it twice gives the same result as applying it once.
pub fn sanitize_mod_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_control() || INVALID_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_end_matches('.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `Foo` -> `DISABLED_Foo`
pub fn disabled_name(name: &str) -> String {
    format!("{}{}", DISABLED_PREFIX, name)
}

/// Logical mod name with the disabled marker removed
pub fn strip_disabled_prefix(name: &str) -> &str {
    name.strip_prefix(DISABLED_PREFIX).unwrap_or(name)
}

/// Whether a directory name carries the disabled marker
pub fn is_disabled(name: &str) -> bool {
    name.starts_with(DISABLED_PREFIX)
}

/// Convert Windows path separators to forward slashes
/// `Root\Textures\body.dds` -> `Root/Textures/body.dds`
pub fn to_linux_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Get the filename from a path (handles both / and \)
pub fn file_name(path: &str) -> &str {
    path.rfind(['\\', '/'])
        .map(|idx| &path[idx + 1..])
        .unwrap_or(path)
}

/// Get file extension (as written, without the dot)
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    name.rfind('.').map(|idx| &name[idx + 1..])
}

/// File name without its archive extension.
///
/// Compound tar extensions are removed as a whole, so `pack.tar.gz`
/// becomes `pack` rather than `pack.tar`.
pub fn archive_stem(path: &str) -> &str {
    let name = file_name(path);
    let lower = name.to_lowercase();
    for compound in [".tar.gz", ".tar.zst", ".tar.xz", ".tar.bz2"] {
        if lower.ends_with(compound) {
            return &name[..name.len() - compound.len()];
        }
    }
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Preview images the application shows for a mod:
/// `preview*.{jpg,jpeg,png}` and `minitile.jpg` (case-insensitive).
pub fn is_preview_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    if lower == "minitile.jpg" {
        return true;
    }
    lower.starts_with("preview")
        && (lower.ends_with(".jpg") || lower.ends_with(".jpeg") || lower.ends_with(".png"))
}

/// Turn an archive-relative path into a path that cannot escape the
/// extraction directory. Returns `None` for absolute paths, `..` components
/// or paths that are empty once normalized.
pub fn safe_relative_path(relative: &str) -> Option<PathBuf> {
    let normalized = to_linux_path(relative);
    let mut out = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Create parent directories for a path if they don't exist
pub fn ensure_parent_dirs(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

//! Settings management
//!
//! Stores user preferences in ~/.config/fxmm/settings.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::installer::InstallOptions;

fn default_true() -> bool {
    true
}

/// User settings for fxmm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Root of the mod library
    #[serde(default)]
    pub mods_dir: String,

    /// Game tag the library belongs to (ZZMI, GIMI, ...)
    #[serde(default)]
    pub game_tag: String,

    /// Snapshot a mod folder before updating it
    #[serde(default)]
    pub backup_before_update: bool,

    /// Empty the mod folder before extracting an update
    #[serde(default)]
    pub clean_install: bool,

    /// Keep preview images during a clean install
    #[serde(default = "default_true")]
    pub preserve_previews: bool,

    /// Fetch screenshots after installing
    #[serde(default = "default_true")]
    pub download_previews: bool,

    /// Add new screenshots after the existing ones instead of replacing them
    #[serde(default)]
    pub combine_previews: bool,

    /// Game tags whose starter pack offer was installed or declined
    #[serde(default)]
    pub dismissed_starter_packs: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mods_dir: String::new(),
            game_tag: String::new(),
            backup_before_update: false,
            clean_install: false,
            preserve_previews: true,
            download_previews: true,
            combine_previews: false,
            dismissed_starter_packs: Vec::new(),
        }
    }
}

impl Settings {
    /// Get the config directory path (~/.config/fxmm)
    fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("fxmm");

        Ok(config_dir)
    }

    /// Get the settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.json"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        match Self::settings_path().and_then(|path| Self::load_from(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Could not load settings: {:#}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Load settings from a specific file; a missing file gives defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;

        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;

        Ok(settings)
    }

    /// Write settings to `path`, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Install options derived from the stored defaults
    pub fn install_options(&self) -> InstallOptions {
        InstallOptions {
            backup: self.backup_before_update,
            clean_install: self.clean_install,
            preserve_previews: self.preserve_previews,
            download_previews: self.download_previews,
            combine_previews: self.combine_previews,
        }
    }

    pub fn is_starter_pack_dismissed(&self, game_tag: &str) -> bool {
        self.dismissed_starter_packs.iter().any(|t| t == game_tag)
    }

    /// Returns false when the pack was already dismissed
    pub fn dismiss_starter_pack(&mut self, game_tag: &str) -> bool {
        if self.is_starter_pack_dismissed(game_tag) {
            return false;
        }
        self.dismissed_starter_packs.push(game_tag.to_string());
        true
    }
}

//! Installation configuration
//!
//! Everything the pipeline needs to know about the environment: where the
//! mod library lives and the per-game lookup tables for the catalog.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::paths::sanitize_mod_name;

/// Category used when a request does not name one
pub const DEFAULT_CATEGORY: &str = "Other";

/// Configuration for the install pipeline
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Root of the mod library (`<root>/<category>/<mod>`)
    pub mods_root: PathBuf,

    /// User agent sent with every request
    pub user_agent: String,

    /// Game tag -> catalog tool id of the game's starter pack
    pub starter_pack_tools: HashMap<String, u64>,

    /// Game tag -> catalog game id, used for browsing
    pub game_ids: HashMap<String, u64>,

    /// Category for requests without one
    pub fallback_category: String,
}

impl InstallConfig {
    pub fn new(mods_root: impl Into<PathBuf>) -> Self {
        Self {
            mods_root: mods_root.into(),
            user_agent: concat!("FlairX-Mod-Manager/", env!("CARGO_PKG_VERSION")).to_string(),
            starter_pack_tools: default_starter_pack_tools(),
            game_ids: default_game_ids(),
            fallback_category: DEFAULT_CATEGORY.to_string(),
        }
    }

    /// Directory of a category inside the mod library
    pub fn category_dir(&self, category: &str) -> PathBuf {
        let category = category.trim();
        if category.is_empty() {
            self.mods_root.join(sanitize_mod_name(&self.fallback_category))
        } else {
            self.mods_root.join(sanitize_mod_name(category))
        }
    }

    /// Tool id of a game's starter pack
    pub fn starter_pack_tool(&self, game_tag: &str) -> Result<u64, ConfigError> {
        self.starter_pack_tools
            .get(game_tag)
            .copied()
            .ok_or_else(|| ConfigError::NoStarterPack(game_tag.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mods_root.as_os_str().is_empty() {
            return Err(ConfigError::MissingModsRoot);
        }

        if self.mods_root.exists() && !self.mods_root.is_dir() {
            return Err(ConfigError::ModsRootNotDirectory(self.mods_root.clone()));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::EmptyUserAgent);
        }

        if let Some((game, _)) = self.starter_pack_tools.iter().find(|(_, id)| **id == 0) {
            return Err(ConfigError::InvalidToolId(game.clone()));
        }

        if self.fallback_category.trim().is_empty() {
            return Err(ConfigError::EmptyFallbackCategory);
        }

        Ok(())
    }
}

/// Starter packs published on the catalog, by game tag
pub fn default_starter_pack_tools() -> HashMap<String, u64> {
    HashMap::from([("ZZMI".to_string(), 20322)])
}

/// Catalog game ids, by game tag
pub fn default_game_ids() -> HashMap<String, u64> {
    [
        ("ZZMI", 19567), // Zenless Zone Zero
        ("GIMI", 8552),  // Genshin Impact
        ("HIMI", 10349), // Honkai Impact 3rd
        ("WWMI", 20357), // Wuthering Waves
        ("SRMI", 18366), // Honkai Star Rail
        ("EFMI", 21842), // Arknights: Endfield
    ]
    .into_iter()
    .map(|(tag, id)| (tag.to_string(), id))
    .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Mod library directory is not set")]
    MissingModsRoot,

    #[error("Mod library path is not a directory: {0}")]
    ModsRootNotDirectory(PathBuf),

    #[error("User agent must not be empty")]
    EmptyUserAgent,

    #[error("Starter pack tool id for {0} must be non-zero")]
    InvalidToolId(String),

    #[error("Fallback category must not be empty")]
    EmptyFallbackCategory,

    #[error("No starter pack is available for {0}")]
    NoStarterPack(String),
}

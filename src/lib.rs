//! fxmm - GameBanana mod installer
//!
//! Downloads mod files from GameBanana, unpacks them into a category
//! folder of the mod library, keeps `mod.json` provenance up to date and
//! handles backups, clean updates and game starter packs.

pub mod archive;
pub mod catalog;
pub mod downloaders;
pub mod installer;
pub mod metadata;
pub mod paths;
pub mod settings;

#[cfg(test)]
mod test_support;

//! `mod.json` sidecar records
//!
//! Every installed mod carries a `mod.json` describing where it came from.
//! The initial install writes the whole record; later updates only touch
//! `dateUpdated` and leave anything else in the file alone, including keys
//! this crate does not know about.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// File name of the metadata record inside a mod directory
pub const MOD_JSON: &str = "mod.json";

/// Placeholder written for dates that were never set
pub const UNSET_DATE: &str = "0000-00-00";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn unset_date() -> String {
    UNSET_DATE.to_string()
}

/// Provenance of an installed mod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModMetadata {
    #[serde(default)]
    pub author: String,
    /// Remote page the mod was installed from. Older records may lack it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default = "unset_date")]
    pub date_checked: String,
    #[serde(default = "unset_date")]
    pub date_updated: String,
    #[serde(rename = "isNSFW", default)]
    pub is_nsfw: bool,
    #[serde(default)]
    pub hotkeys: Vec<Value>,
}

impl Default for ModMetadata {
    fn default() -> Self {
        Self {
            author: String::new(),
            url: None,
            version: String::new(),
            date_checked: unset_date(),
            date_updated: unset_date(),
            is_nsfw: false,
            hotkeys: Vec::new(),
        }
    }
}

impl ModMetadata {
    /// Record for a fresh install. `dateChecked` is today.
    pub fn for_install(
        author: &str,
        url: &str,
        version: &str,
        is_nsfw: bool,
        date_updated: Option<NaiveDate>,
    ) -> Self {
        Self {
            author: author.to_string(),
            url: Some(url.to_string()),
            version: version.to_string(),
            date_checked: format_date(today()),
            date_updated: date_updated.map(format_date).unwrap_or_else(unset_date),
            is_nsfw,
            hotkeys: Vec::new(),
        }
    }

    /// Parsed `dateUpdated`, `None` when unset or malformed
    pub fn date_updated(&self) -> Option<NaiveDate> {
        parse_date(&self.date_updated)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Read `mod.json` from a mod directory.
///
/// A missing or malformed file yields `None`; callers treat that the same
/// as a directory without provenance.
pub fn read_metadata(mod_dir: &Path) -> Option<ModMetadata> {
    let path = mod_dir.join(MOD_JSON);
    let content = fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(meta) => Some(meta),
        Err(e) => {
            debug!("Ignoring malformed {}: {}", path.display(), e);
            None
        }
    }
}

/// Write (overwrite) `mod.json` in a mod directory
pub fn write_metadata(mod_dir: &Path, meta: &ModMetadata) -> io::Result<()> {
    let json = serde_json::to_string_pretty(meta)?;
    fs::write(mod_dir.join(MOD_JSON), json)
}

/// Set `dateUpdated` in an existing `mod.json`, keeping every other key.
///
/// A missing file, or one that is not a JSON object, is replaced by an
/// object holding only `dateUpdated`.
pub fn merge_date_updated(mod_dir: &Path, date: NaiveDate) -> io::Result<()> {
    let path = mod_dir.join(MOD_JSON);

    let mut object = fs::read_to_string(&path)
        .ok()
        .and_then(|content| serde_json::from_str::<Value>(&content).ok())
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_else(Map::new);

    object.insert("dateUpdated".to_string(), Value::String(format_date(date)));

    let json = serde_json::to_string_pretty(&Value::Object(object))?;
    fs::write(&path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_write_uses_camel_case_keys() {
        let dir = tempdir().unwrap();
        let meta = ModMetadata::for_install(
            "someone",
            "https://gamebanana.com/mods/123",
            "1.2",
            true,
            Some(date(2024, 5, 1)),
        );
        write_metadata(dir.path(), &meta).unwrap();

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(MOD_JSON)).unwrap()).unwrap();
        assert_eq!(raw["author"], "someone");
        assert_eq!(raw["url"], "https://gamebanana.com/mods/123");
        assert_eq!(raw["dateUpdated"], "2024-05-01");
        assert_eq!(raw["isNSFW"], true);
        assert_eq!(raw["hotkeys"], Value::Array(vec![]));
        assert!(parse_date(raw["dateChecked"].as_str().unwrap()).is_some());
    }

    #[test]
    fn test_missing_date_is_placeholder() {
        let meta = ModMetadata::for_install("a", "u", "", false, None);
        assert_eq!(meta.date_updated, UNSET_DATE);
        assert_eq!(meta.date_updated(), None);
    }

    #[test]
    fn test_read_tolerates_missing_url() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MOD_JSON),
            r#"{"author":"unknown","version":"","dateChecked":"0000-00-00"}"#,
        )
        .unwrap();

        let meta = read_metadata(dir.path()).unwrap();
        assert_eq!(meta.author, "unknown");
        assert_eq!(meta.url, None);
        assert_eq!(meta.date_updated, UNSET_DATE);
    }

    #[test]
    fn test_read_malformed_is_none() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MOD_JSON), "{ not json").unwrap();
        assert!(read_metadata(dir.path()).is_none());
        assert!(read_metadata(&dir.path().join("missing")).is_none());
    }

    #[test]
    fn test_merge_keeps_unknown_fields() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(MOD_JSON),
            r#"{"author":"x","url":"u","statusKeeperSync":true,"dateUpdated":"2020-01-01"}"#,
        )
        .unwrap();

        merge_date_updated(dir.path(), date(2025, 2, 3)).unwrap();

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(MOD_JSON)).unwrap()).unwrap();
        assert_eq!(raw["dateUpdated"], "2025-02-03");
        assert_eq!(raw["author"], "x");
        assert_eq!(raw["url"], "u");
        assert_eq!(raw["statusKeeperSync"], true);
    }

    #[test]
    fn test_merge_creates_file_when_missing() {
        let dir = tempdir().unwrap();
        merge_date_updated(dir.path(), date(2025, 2, 3)).unwrap();

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(MOD_JSON)).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "dateUpdated": "2025-02-03" }));
    }
}

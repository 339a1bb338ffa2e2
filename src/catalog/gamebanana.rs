//! GameBanana apiv11 client

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{
    date_from_timestamp, CatalogError, ModCatalog, ModFile, ModListPage, ModRecord, ModSort,
    PreviewImage,
};
use crate::downloaders::HttpClient;

pub const API_BASE_URL: &str = "https://gamebanana.com/apiv11";

const MOD_PROPERTIES: &str = "_idRow,_sName,_sText,_sProfileUrl,_aSubmitter,_aFiles,_aPreviewMedia,_tsDateAdded,_tsDateUpdated,_sVersion,_bHasContentRatings";
const LIST_PROPERTIES: &str = "_idRow,_sName,_sProfileUrl,_tsDateAdded,_tsDateUpdated,_nDownloadCount,_aPreviewMedia,_aSubmitter,_bHasContentRatings";
const PER_PAGE: u32 = 50;

#[derive(Debug, Deserialize)]
struct RawSubmitter {
    #[serde(rename = "_sName", default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawMod {
    #[serde(rename = "_idRow", default)]
    id: u64,
    #[serde(rename = "_sName", default)]
    name: String,
    #[serde(rename = "_sText", default)]
    text: Option<String>,
    #[serde(rename = "_sProfileUrl", default)]
    profile_url: String,
    #[serde(rename = "_aSubmitter", default)]
    submitter: Option<RawSubmitter>,
    #[serde(rename = "_aFiles", default)]
    files: Option<Vec<ModFile>>,
    /// Object with `_aImages`, or an empty array when the mod has no media
    #[serde(rename = "_aPreviewMedia", default)]
    preview_media: Value,
    #[serde(rename = "_sVersion", default)]
    version: Option<String>,
    #[serde(rename = "_tsDateUpdated", default)]
    date_updated: Option<i64>,
    #[serde(rename = "_tsDateAdded", default)]
    date_added: Option<i64>,
    #[serde(rename = "_bHasContentRatings", default)]
    has_content_ratings: bool,
}

impl RawMod {
    fn into_record(self) -> ModRecord {
        ModRecord {
            id: self.id,
            name: self.name,
            author: self.submitter.map(|s| s.name).filter(|n| !n.is_empty()),
            profile_url: self.profile_url,
            description: self.text,
            version: self.version.filter(|v| !v.trim().is_empty()),
            preview_images: preview_images(&self.preview_media),
            // Never-updated mods report 0; their upload date stands in
            date_updated: self
                .date_updated
                .and_then(date_from_timestamp)
                .or_else(|| self.date_added.and_then(date_from_timestamp)),
            is_nsfw: self.has_content_ratings,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFilesOnly {
    #[serde(rename = "_aFiles", default)]
    files: Option<Vec<ModFile>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawListMetadata {
    #[serde(rename = "_nRecordCount", default)]
    record_count: u64,
    #[serde(rename = "_bIsComplete", default)]
    is_complete: bool,
}

#[derive(Debug, Deserialize)]
struct RawModList {
    #[serde(rename = "_aRecords", default)]
    records: Vec<RawMod>,
    #[serde(rename = "_aMetadata", default)]
    metadata: RawListMetadata,
}

/// `{baseUrl}/{file}` for every image in `_aPreviewMedia._aImages`
fn preview_images(media: &Value) -> Vec<PreviewImage> {
    let Some(images) = media.get("_aImages").and_then(Value::as_array) else {
        return Vec::new();
    };

    images
        .iter()
        .filter_map(|img| {
            let base = img.get("_sBaseUrl")?.as_str()?;
            let file = img.get("_sFile")?.as_str()?;
            if base.is_empty() || file.is_empty() {
                return None;
            }
            let kind = img.get("_sType").and_then(Value::as_str).unwrap_or_default();
            Some(PreviewImage {
                kind: kind.to_string(),
                url: format!("{}/{}", base.trim_end_matches('/'), file),
            })
        })
        .collect()
}

/// GameBanana API client. One attempt per call, no caching.
#[derive(Clone)]
pub struct GameBananaClient {
    http: HttpClient,
    base_url: String,
    game_ids: HashMap<String, u64>,
}

impl GameBananaClient {
    pub fn new(http: HttpClient, game_ids: HashMap<String, u64>) -> Self {
        Self {
            http,
            base_url: API_BASE_URL.to_string(),
            game_ids,
        }
    }

    /// Point the client at another API root (mirrors, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        debug!("GameBanana API: {}", url);
        let response = self
            .http
            .inner()
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Http {
                status: status.as_u16(),
                url: crate::downloaders::truncate_url(url),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ModCatalog for GameBananaClient {
    async fn mod_details(&self, mod_id: u64) -> Result<ModRecord, CatalogError> {
        let url = format!(
            "{}/Mod/{}?_csvProperties={}",
            self.base_url, mod_id, MOD_PROPERTIES
        );
        let raw: RawMod = self.get_json(&url).await?;
        Ok(raw.into_record())
    }

    async fn mod_files(&self, mod_id: u64) -> Result<Vec<ModFile>, CatalogError> {
        let url = format!(
            "{}/Mod/{}?_csvProperties={}",
            self.base_url, mod_id, MOD_PROPERTIES
        );
        let raw: RawMod = self.get_json(&url).await?;
        // Private or withdrawn mods come back without submitter or files
        match (raw.submitter, raw.files) {
            (Some(_), Some(files)) => Ok(files),
            _ => Err(CatalogError::Unavailable(format!("Mod {}", mod_id))),
        }
    }

    async fn list_mods(
        &self,
        game_tag: &str,
        page: u32,
        sort: ModSort,
    ) -> Result<ModListPage, CatalogError> {
        let game_id = self
            .game_ids
            .get(game_tag)
            .copied()
            .ok_or_else(|| CatalogError::UnknownGame(game_tag.to_string()))?;

        let mut url = format!(
            "{}/Game/{}/Subfeed?_nPage={}&_nPerpage={}&_csvModelInclusions=Mod&_csvProperties={}",
            self.base_url,
            game_id,
            page.max(1),
            PER_PAGE,
            LIST_PROPERTIES
        );
        match sort {
            ModSort::Default => {}
            ModSort::New => url.push_str("&_sOrderBy=_tsDateAdded,DESC"),
            ModSort::Updated => url.push_str("&_sOrderBy=_tsDateUpdated,DESC"),
        }

        let raw: RawModList = self.get_json(&url).await?;
        Ok(ModListPage {
            records: raw.records.into_iter().map(RawMod::into_record).collect(),
            record_count: raw.metadata.record_count,
            is_complete: raw.metadata.is_complete,
        })
    }

    async fn tool_files(&self, tool_id: u64) -> Result<Vec<ModFile>, CatalogError> {
        let url = format!("{}/Tool/{}?_csvProperties=_aFiles", self.base_url, tool_id);
        let raw: RawFilesOnly = self.get_json(&url).await?;
        Ok(raw.files.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, test_client, Route};
    use chrono::NaiveDate;

    const MOD_JSON: &str = r#"{
        "_idRow": 512345,
        "_sName": "Ellen Maid Outfit",
        "_sText": "<p>desc</p>",
        "_sProfileUrl": "https://gamebanana.com/mods/512345",
        "_aSubmitter": {"_idRow": 1, "_sName": "modder"},
        "_aFiles": [
            {"_idRow": 1, "_sFile": "ellen.zip", "_nFilesize": 10, "_sDownloadUrl": "https://gamebanana.com/dl/1"}
        ],
        "_aPreviewMedia": {"_aImages": [
            {"_sType": "screenshot", "_sBaseUrl": "https://images.gamebanana.com/img/ss/mods", "_sFile": "a.jpg"},
            {"_sType": "embedded", "_sBaseUrl": "https://images.gamebanana.com/img/ss/mods", "_sFile": "b.png"}
        ]},
        "_tsDateUpdated": 1700000000,
        "_sVersion": "1.3",
        "_bHasContentRatings": true
    }"#;

    fn client(base: &str) -> GameBananaClient {
        let ids = HashMap::from([("ZZMI".to_string(), 19567)]);
        GameBananaClient::new(test_client(), ids).with_base_url(base)
    }

    #[test]
    fn test_preview_images_tolerates_empty_media() {
        assert!(preview_images(&Value::Array(vec![])).is_empty());
        assert!(preview_images(&Value::Null).is_empty());
    }

    #[test]
    fn test_date_updated_falls_back_to_date_added() {
        let raw: RawMod =
            serde_json::from_str(r#"{"_tsDateUpdated": 0, "_tsDateAdded": 1700000000}"#).unwrap();
        assert_eq!(raw.into_record().date_updated, NaiveDate::from_ymd_opt(2023, 11, 14));

        let raw: RawMod = serde_json::from_str(r#"{"_idRow": 1}"#).unwrap();
        assert_eq!(raw.into_record().date_updated, None);
    }

    #[tokio::test]
    async fn test_mod_details() {
        let base = serve(vec![Route::ok(
            &format!("/Mod/512345?_csvProperties={}", MOD_PROPERTIES),
            MOD_JSON.as_bytes().to_vec(),
        )])
        .await;

        let record = client(&base).mod_details(512345).await.unwrap();
        assert_eq!(record.name, "Ellen Maid Outfit");
        assert_eq!(record.author.as_deref(), Some("modder"));
        assert_eq!(record.version.as_deref(), Some("1.3"));
        assert!(record.is_nsfw);
        assert_eq!(record.preview_images.len(), 2);
        assert!(record.preview_images[0].is_screenshot());
        assert_eq!(
            record.preview_images[0].url,
            "https://images.gamebanana.com/img/ss/mods/a.jpg"
        );
        assert!(!record.preview_images[1].is_screenshot());
    }

    #[tokio::test]
    async fn test_mod_files_unavailable_without_submitter() {
        let base = serve(vec![Route::ok(
            &format!("/Mod/9?_csvProperties={}", MOD_PROPERTIES),
            br#"{"_idRow": 9, "_sName": "gone"}"#.to_vec(),
        )])
        .await;

        let err = client(&base).mod_files(9).await.unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_tool_files() {
        let base = serve(vec![Route::ok(
            "/Tool/20322?_csvProperties=_aFiles",
            br#"{"_aFiles":[{"_idRow":5,"_sFile":"pack.7z","_sDownloadUrl":"https://gamebanana.com/dl/5"}]}"#.to_vec(),
        )])
        .await;

        let files = client(&base).tool_files(20322).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "pack.7z");
    }

    #[tokio::test]
    async fn test_list_mods_unknown_game() {
        let err = client("http://127.0.0.1:9")
            .list_mods("NOPE", 1, ModSort::Default)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownGame(_)));
    }

    #[tokio::test]
    async fn test_list_mods_http_error() {
        let base = serve(vec![]).await;
        let err = client(&base)
            .list_mods("ZZMI", 1, ModSort::Updated)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Http { status: 404, .. }));
    }
}

//! Starter pack installer
//!
//! A game's starter pack is a single archive published as a catalog tool.
//! It is unpacked verbatim into the mod library root, since it already
//! carries its own category folders. Both download and extraction can be
//! cancelled; the temp archive is removed on every path.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{
    download_one, emit, extract_blocking, finish, Halt, InstallConfig, InstallOutcome,
    InstallReport, InstallStage, InstallationTarget, PipelineError, ProgressEvent, ProgressSink,
};
use crate::catalog::ModCatalog;
use crate::downloaders::HttpClient;
use crate::settings::Settings;

pub struct StarterPack {
    config: InstallConfig,
    http: HttpClient,
    catalog: Arc<dyn ModCatalog>,
    progress: Option<ProgressSink>,
    /// Settings file that records dismissed packs; `None` skips recording
    settings_path: Option<PathBuf>,
}

impl StarterPack {
    pub fn new(
        config: InstallConfig,
        http: HttpClient,
        catalog: Arc<dyn ModCatalog>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            http,
            catalog,
            progress: None,
            settings_path: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Whether a starter pack exists for the game and was not dismissed yet
    pub fn is_offered(&self, game_tag: &str) -> bool {
        if self.config.starter_pack_tool(game_tag).is_err() {
            return false;
        }
        match &self.settings_path {
            Some(path) => Settings::load_from(path)
                .map(|s| !s.is_starter_pack_dismissed(game_tag))
                .unwrap_or(true),
            None => true,
        }
    }

    /// Record that the pack should not be offered again
    pub fn dismiss(&self, game_tag: &str) {
        let Some(path) = &self.settings_path else {
            return;
        };
        let result = Settings::load_from(path).and_then(|mut settings| {
            if settings.dismiss_starter_pack(game_tag) {
                settings.save_to(path)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            warn!("Could not record dismissed starter pack for {}: {:#}", game_tag, e);
        }
    }

    /// Download the game's starter pack and unpack it into the mod library
    pub async fn install(
        &self,
        game_tag: &str,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome, PipelineError> {
        info!("Installing starter pack for {}", game_tag);
        let result = self.run(game_tag, cancel).await;
        if result.is_ok() {
            self.dismiss(game_tag);
        }
        finish(self.progress.as_ref(), result)
    }

    async fn run(&self, game_tag: &str, cancel: &CancellationToken) -> Result<InstallReport, Halt> {
        let tool_id = self.config.starter_pack_tool(game_tag)?;

        let files = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Halt::Cancelled),
            files = self.catalog.tool_files(tool_id) => files?,
        };
        let Some(file) = files.into_iter().find(|f| !f.download_url.is_empty()) else {
            return Err(PipelineError::NoFiles.into());
        };

        // Removed when dropped, whichever way this function exits
        let temp_path = tempfile::Builder::new()
            .prefix(&format!("starterpack_{}_", game_tag))
            .suffix(".7z")
            .tempfile()
            .map_err(|e| PipelineError::Io {
                path: std::env::temp_dir(),
                source: e,
            })?
            .into_temp_path();

        emit(self.progress.as_ref(), ProgressEvent::Stage(InstallStage::Downloading));
        let archive = download_one(
            &self.http,
            self.progress.as_ref(),
            &file,
            temp_path.to_path_buf(),
            0,
            1,
            cancel,
        )
        .await?;

        emit(self.progress.as_ref(), ProgressEvent::Stage(InstallStage::Extracting));
        let mods_root = self.config.mods_root.clone();
        tokio::fs::create_dir_all(&mods_root)
            .await
            .map_err(|e| PipelineError::Io {
                path: mods_root.clone(),
                source: e,
            })?;

        let summary =
            extract_blocking(self.progress.clone(), archive, mods_root.clone(), false, cancel)
                .await?;

        info!(
            "Starter pack for {} installed: {} files",
            game_tag, summary.files_written
        );
        Ok(InstallReport {
            target: InstallationTarget {
                category_dir: mods_root.clone(),
                logical_name: file.file_name,
                resolved_path: mods_root,
                is_update: false,
            },
            files_extracted: summary.files_written,
            backup: None,
            previews_downloaded: 0,
        })
    }
}

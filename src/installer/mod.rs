//! Installation orchestrator
//!
//! Coordinates the stages of a mod install:
//! 1. Downloading: fetch every remote file into a private temp dir
//! 2. Extracting: resolve the target folder, optional backup and clean,
//!    then unpack archives (or copy plain files)
//! 3. WritingMetadata: write or merge `mod.json`
//! 4. DownloadingPreviews: optional screenshots from the catalog
//! 5. Complete: post-install hooks are started in the background
//!
//! Cancellation is not an error: it ends the run with
//! [`InstallOutcome::Cancelled`] and leaves no temp files behind.

pub mod backup;
pub mod clean;
pub mod config;
pub mod hooks;
pub mod previews;
pub mod resolver;
pub mod starter_pack;
pub mod update_check;

pub use config::{ConfigError, InstallConfig};
pub use hooks::PostInstallHook;
pub use resolver::InstallationTarget;
pub use starter_pack::StarterPack;
pub use update_check::{check_for_update, installed_mods, UpdateStatus};

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::{
    extract_archive_with, is_archive_file, ArchiveError, EntryProgress, ExtractSummary,
};
use crate::catalog::{mod_id_from_url, CatalogError, ModCatalog, ModFile, ModRecord, PreviewImage};
use crate::downloaders::{
    download_file, DownloadError, DownloadTask, HttpClient, PercentCallback,
};
use crate::metadata::{self, ModMetadata};
use crate::paths;

/// Stages reported while a request runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Downloading,
    Extracting,
    WritingMetadata,
    DownloadingPreviews,
    Complete,
    Failed,
}

/// Progress information
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Entered a new stage
    Stage(InstallStage),
    /// Percent of the current file, with its position in the request
    Download {
        file_name: String,
        index: usize,
        count: usize,
        percent: f64,
    },
    /// Entries written from the current archive
    Extract {
        file_name: String,
        processed: usize,
        total: usize,
    },
    /// The run failed; the message is meant for the user
    Failed { message: String },
}

/// Progress callback. Called from the task running the pipeline and from
/// blocking extraction threads, so UIs must marshal to their own thread.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Per-request switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Zip the existing folder before an update
    pub backup: bool,
    /// Empty the existing folder before an update
    pub clean_install: bool,
    /// Keep preview images during a clean install
    pub preserve_previews: bool,
    /// Fetch screenshots after installing
    pub download_previews: bool,
    /// Number new screenshots after existing ones instead of replacing them
    pub combine_previews: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            backup: false,
            clean_install: false,
            preserve_previews: true,
            download_previews: false,
            combine_previews: false,
        }
    }
}

/// Everything needed to install one mod
#[derive(Debug, Clone, Default)]
pub struct InstallRequest {
    pub mod_name: String,
    pub category: String,
    pub files: Vec<ModFile>,
    /// Mod page URL, stored in `mod.json` and used for update detection
    pub source_url: String,
    pub author: String,
    pub is_nsfw: bool,
    /// Catalog id; derived from `source_url` when not set
    pub mod_id: Option<u64>,
    /// Remote update date written as `dateUpdated`
    pub date_updated: Option<NaiveDate>,
    /// Preview images; fetched from the catalog when empty
    pub previews: Vec<PreviewImage>,
    pub options: InstallOptions,
}

/// Result of a finished install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub target: InstallationTarget,
    pub files_extracted: usize,
    pub backup: Option<PathBuf>,
    pub previews_downloaded: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Completed(InstallReport),
    Cancelled,
}

impl InstallOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InstallOutcome::Cancelled)
    }

    pub fn report(&self) -> Option<&InstallReport> {
        match self {
            InstallOutcome::Completed(report) => Some(report),
            InstallOutcome::Cancelled => None,
        }
    }
}

/// Installation errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No files to install")]
    NoFiles,

    #[error("Failed to download {file}: {source}")]
    Download {
        file: String,
        #[source]
        source: DownloadError,
    },

    #[error("Failed to extract {file}: {source}")]
    Extract {
        file: String,
        #[source]
        source: ArchiveError,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl PipelineError {
    fn io(path: &Path, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Why a run stopped early
#[derive(Debug)]
pub(crate) enum Halt {
    Cancelled,
    Failed(PipelineError),
}

impl From<PipelineError> for Halt {
    fn from(err: PipelineError) -> Self {
        Halt::Failed(err)
    }
}

impl From<ConfigError> for Halt {
    fn from(err: ConfigError) -> Self {
        Halt::Failed(err.into())
    }
}

impl From<CatalogError> for Halt {
    fn from(err: CatalogError) -> Self {
        Halt::Failed(err.into())
    }
}

impl From<tokio::task::JoinError> for Halt {
    fn from(err: tokio::task::JoinError) -> Self {
        Halt::Failed(err.into())
    }
}

/// Turn an internal result into the public outcome, reporting failures
pub(crate) fn finish(
    progress: Option<&ProgressSink>,
    result: Result<InstallReport, Halt>,
) -> Result<InstallOutcome, PipelineError> {
    match result {
        Ok(report) => {
            emit(progress, ProgressEvent::Stage(InstallStage::Complete));
            Ok(InstallOutcome::Completed(report))
        }
        Err(Halt::Cancelled) => {
            info!("Installation cancelled");
            Ok(InstallOutcome::Cancelled)
        }
        Err(Halt::Failed(err)) => {
            warn!("Installation failed: {}", err);
            emit(progress, ProgressEvent::Stage(InstallStage::Failed));
            emit(
                progress,
                ProgressEvent::Failed {
                    message: err.to_string(),
                },
            );
            Err(err)
        }
    }
}

pub(crate) fn emit(progress: Option<&ProgressSink>, event: ProgressEvent) {
    if let Some(callback) = progress {
        callback(event);
    }
}

/// Name a remote file gets on disk
fn local_file_name(file: &ModFile) -> String {
    let name = paths::file_name(file.file_name.trim());
    if name.is_empty() {
        format!("file_{}", file.id)
    } else {
        paths::sanitize_mod_name(name)
    }
}

/// Reserve `name` in a batch container, or the first free `name_N`
/// (`readme_1.txt` for files). Comparison ignores case.
fn claim_name(taken: &mut HashSet<String>, name: &str, is_file: bool) -> String {
    let (stem, extension) = match name.rfind('.') {
        Some(dot) if is_file && dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };

    let mut candidate = name.to_string();
    let mut counter = 1;
    while !taken.insert(candidate.to_lowercase()) {
        candidate = format!("{}_{}{}", stem, counter, extension);
        counter += 1;
    }
    candidate
}

/// Download one file, mapping failures to pipeline errors
pub(crate) async fn download_one(
    http: &HttpClient,
    progress: Option<&ProgressSink>,
    file: &ModFile,
    destination: PathBuf,
    index: usize,
    count: usize,
    cancel: &CancellationToken,
) -> Result<PathBuf, Halt> {
    let file_name = local_file_name(file);
    let task =
        DownloadTask::new(&file.download_url, destination).with_expected_size(file.file_size);

    let report = |percent: f64| {
        emit(
            progress,
            ProgressEvent::Download {
                file_name: file_name.clone(),
                index,
                count,
                percent,
            },
        )
    };
    let report_ref: PercentCallback<'_> = &report;

    match download_file(http, &task, Some(report_ref), cancel).await {
        Ok(bytes) => {
            debug!("Downloaded {} ({} bytes)", file_name, bytes);
            Ok(task.destination)
        }
        Err(DownloadError::Cancelled) => Err(Halt::Cancelled),
        Err(source) => Err(Halt::Failed(PipelineError::Download {
            file: file_name,
            source,
        })),
    }
}

/// Extract on a blocking thread with entry progress and cancellation
pub(crate) async fn extract_blocking(
    progress: Option<ProgressSink>,
    archive: PathBuf,
    destination: PathBuf,
    strip_root: bool,
    cancel: &CancellationToken,
) -> Result<ExtractSummary, Halt> {
    let file_name = paths::file_name(&archive.to_string_lossy()).to_string();
    let token = cancel.clone();
    let label = file_name.clone();

    let result = tokio::task::spawn_blocking(move || {
        let report = move |processed: usize, total: usize| {
            emit(
                progress.as_ref(),
                ProgressEvent::Extract {
                    file_name: label.clone(),
                    processed,
                    total,
                },
            )
        };
        let report_ref: EntryProgress<'_> = &report;
        extract_archive_with(&archive, &destination, strip_root, Some(report_ref), Some(&token))
    })
    .await?;

    match result {
        Ok(summary) => Ok(summary),
        Err(ArchiveError::Cancelled) => Err(Halt::Cancelled),
        Err(source) => Err(Halt::Failed(PipelineError::Extract {
            file: file_name,
            source,
        })),
    }
}

/// Raw bytes of a mod's `mod.json`, if it has one
async fn saved_record(mod_dir: &Path) -> Option<Vec<u8>> {
    tokio::fs::read(mod_dir.join(metadata::MOD_JSON)).await.ok()
}

/// Write a saved `mod.json` back when a clean pass removed it
async fn restore_record(mod_dir: &Path, saved: Option<Vec<u8>>) -> Result<(), PipelineError> {
    let Some(saved) = saved else {
        return Ok(());
    };
    let path = mod_dir.join(metadata::MOD_JSON);
    if path.exists() {
        return Ok(());
    }
    debug!("Restoring {}", path.display());
    tokio::fs::write(&path, saved)
        .await
        .map_err(|e| PipelineError::io(&path, e))
}

/// Runs install and update requests
pub struct InstallPipeline {
    config: InstallConfig,
    http: HttpClient,
    catalog: Arc<dyn ModCatalog>,
    hooks: Vec<Arc<dyn PostInstallHook>>,
    progress: Option<ProgressSink>,
}

impl InstallPipeline {
    /// Create a pipeline; the configuration is validated here
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
            hooks: Vec::new(),
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn PostInstallHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    fn emit(&self, event: ProgressEvent) {
        emit(self.progress.as_ref(), event);
    }

    /// Install a mod from the catalog.
    ///
    /// A single file installs into the folder picked by
    /// [`resolver::resolve_target`] (updating in place when the stored URL
    /// matches). Several files always get a fresh container with one
    /// subfolder per archive. `mod.json` is written from scratch.
    pub async fn install(
        &self,
        request: InstallRequest,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome, PipelineError> {
        info!(
            "Installing {} ({} file(s)) into category {:?}",
            request.mod_name,
            request.files.len(),
            request.category
        );
        let result = self.run_install(&request, cancel).await;
        finish(self.progress.as_ref(), result)
    }

    /// Update an installed mod in place from the given files.
    ///
    /// Only `dateUpdated` in `mod.json` is touched; every other key is kept.
    pub async fn update(
        &self,
        mod_dir: &Path,
        files: &[ModFile],
        options: &InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<InstallOutcome, PipelineError> {
        info!("Updating {} from {} file(s)", mod_dir.display(), files.len());
        let result = self.run_update(mod_dir, files, options, cancel).await;
        finish(self.progress.as_ref(), result)
    }

    async fn download_all(
        &self,
        files: &[ModFile],
        temp_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>, Halt> {
        self.emit(ProgressEvent::Stage(InstallStage::Downloading));

        let mut downloaded = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Halt::Cancelled);
            }
            // One subfolder per file so equal names never collide
            let destination = temp_dir.join(index.to_string()).join(local_file_name(file));
            let path = download_one(
                &self.http,
                self.progress.as_ref(),
                file,
                destination,
                index,
                files.len(),
                cancel,
            )
            .await?;
            downloaded.push(path);
        }
        Ok(downloaded)
    }

    /// Backup and clean an existing folder as requested. Both are best effort.
    async fn prepare_existing(&self, mod_dir: &Path, options: &InstallOptions) -> Option<PathBuf> {
        let mut backup_path = None;

        if options.backup {
            let dir = mod_dir.to_path_buf();
            match tokio::task::spawn_blocking(move || backup::create_backup(&dir)).await {
                Ok(Ok(path)) => backup_path = Some(path),
                Ok(Err(e)) => warn!("Backup of {} failed, continuing: {:#}", mod_dir.display(), e),
                Err(e) => warn!("Backup task for {} failed, continuing: {}", mod_dir.display(), e),
            }
        }

        if options.clean_install {
            let dir = mod_dir.to_path_buf();
            let preserve = options.preserve_previews;
            let cleaned =
                tokio::task::spawn_blocking(move || clean::clean_mod_folder(&dir, preserve)).await;
            match cleaned {
                Ok(report) if report.failures > 0 => warn!(
                    "{} item(s) could not be removed from {}",
                    report.failures,
                    mod_dir.display()
                ),
                Ok(_) => {}
                Err(e) => warn!("Clean task for {} failed, continuing: {}", mod_dir.display(), e),
            }
        }

        backup_path
    }

    /// Extract archives and copy plain files into `target`.
    ///
    /// With `subfolders`, each archive goes into its own folder named after
    /// the archive and names that repeat within the batch get a `_N`
    /// suffix; otherwise archives are unpacked straight into `target`.
    async fn place_files(
        &self,
        downloaded: &[PathBuf],
        target: &Path,
        subfolders: bool,
        cancel: &CancellationToken,
    ) -> Result<usize, Halt> {
        self.emit(ProgressEvent::Stage(InstallStage::Extracting));
        tokio::fs::create_dir_all(target)
            .await
            .map_err(|e| PipelineError::io(target, e))?;

        let mut taken = HashSet::new();
        let mut written = 0;
        for path in downloaded {
            if cancel.is_cancelled() {
                return Err(Halt::Cancelled);
            }

            let name = paths::file_name(&path.to_string_lossy()).to_string();
            if is_archive_file(&name) {
                let destination = if subfolders {
                    let folder = paths::sanitize_mod_name(paths::archive_stem(&name));
                    target.join(claim_name(&mut taken, &folder, false))
                } else {
                    target.to_path_buf()
                };
                let summary = extract_blocking(
                    self.progress.clone(),
                    path.clone(),
                    destination,
                    true,
                    cancel,
                )
                .await?;
                if summary.files_skipped > 0 {
                    warn!("{}: {} unsafe entries skipped", name, summary.files_skipped);
                }
                written += summary.files_written;
            } else {
                let destination = if subfolders {
                    target.join(claim_name(&mut taken, &name, true))
                } else {
                    target.join(&name)
                };
                tokio::fs::copy(path, &destination)
                    .await
                    .map_err(|e| PipelineError::io(&destination, e))?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Catalog details for the version and previews; failures leave them blank
    async fn lookup_details(&self, request: &InstallRequest) -> Option<ModRecord> {
        let mod_id = request.mod_id.or_else(|| mod_id_from_url(&request.source_url))?;
        match self.catalog.mod_details(mod_id).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Could not look up mod {}: {}", mod_id, e);
                None
            }
        }
    }

    async fn run_install(
        &self,
        request: &InstallRequest,
        cancel: &CancellationToken,
    ) -> Result<InstallReport, Halt> {
        if request.files.is_empty() {
            return Err(PipelineError::NoFiles.into());
        }

        let temp_dir = tempfile::Builder::new()
            .prefix("fxmm-install-")
            .tempdir()
            .map_err(|e| PipelineError::io(&std::env::temp_dir(), e))?;

        let downloaded = self.download_all(&request.files, temp_dir.path(), cancel).await?;

        let category_dir = self.config.category_dir(&request.category);
        let batch = downloaded.len() > 1;
        let target = if batch {
            resolver::unique_container(&category_dir, &request.mod_name)
        } else {
            resolver::resolve_target(&category_dir, &request.mod_name, &request.source_url)
        };
        info!(
            "Target: {} ({})",
            target.resolved_path.display(),
            if target.is_update { "update" } else { "new" }
        );

        let (backup, saved_record) = if target.is_update {
            let saved = saved_record(&target.resolved_path).await;
            (self.prepare_existing(&target.resolved_path, &request.options).await, saved)
        } else {
            (None, None)
        };

        let placed = self
            .place_files(&downloaded, &target.resolved_path, batch, cancel)
            .await;
        // Keeps the folder recognisable as an update if extraction failed
        let restored = restore_record(&target.resolved_path, saved_record).await;
        let files_extracted = placed?;
        restored?;

        // Downloads are no longer needed
        drop(temp_dir);

        self.emit(ProgressEvent::Stage(InstallStage::WritingMetadata));
        let details = self.lookup_details(request).await;
        let version = details
            .as_ref()
            .and_then(|d| d.version.clone())
            .unwrap_or_default();
        let author = if request.author.trim().is_empty() {
            details
                .as_ref()
                .and_then(|d| d.author.clone())
                .unwrap_or_else(|| "unknown".to_string())
        } else {
            request.author.clone()
        };
        let record = ModMetadata::for_install(
            &author,
            &request.source_url,
            &version,
            request.is_nsfw,
            request.date_updated,
        );
        metadata::write_metadata(&target.resolved_path, &record)
            .map_err(|e| PipelineError::io(&target.resolved_path.join(metadata::MOD_JSON), e))?;

        let mut previews_downloaded = 0;
        if request.options.download_previews {
            self.emit(ProgressEvent::Stage(InstallStage::DownloadingPreviews));
            let images = if request.previews.is_empty() {
                details.map(|d| d.preview_images).unwrap_or_default()
            } else {
                request.previews.clone()
            };
            let mode = if request.options.combine_previews {
                previews::PreviewMode::Combine
            } else {
                previews::PreviewMode::Replace
            };
            let report =
                previews::fetch_previews(&self.http, &target.resolved_path, &images, mode, cancel)
                    .await;
            previews_downloaded = report.downloaded;
        }

        hooks::spawn_hooks(&self.hooks, &target.resolved_path);

        info!(
            "Installed {} files into {}",
            files_extracted,
            target.resolved_path.display()
        );
        Ok(InstallReport {
            target,
            files_extracted,
            backup,
            previews_downloaded,
        })
    }

    async fn run_update(
        &self,
        mod_dir: &Path,
        files: &[ModFile],
        options: &InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<InstallReport, Halt> {
        if files.is_empty() {
            return Err(PipelineError::NoFiles.into());
        }

        let temp_dir = tempfile::Builder::new()
            .prefix("fxmm-update-")
            .tempdir()
            .map_err(|e| PipelineError::io(&std::env::temp_dir(), e))?;

        let downloaded = self.download_all(files, temp_dir.path(), cancel).await?;

        // A clean install removes mod.json along with everything else; the
        // record is put back whatever happens so only dateUpdated changes.
        let record_path = mod_dir.join(metadata::MOD_JSON);
        let saved_record = saved_record(mod_dir).await;

        let backup = if mod_dir.is_dir() {
            self.prepare_existing(mod_dir, options).await
        } else {
            None
        };

        let placed = self.place_files(&downloaded, mod_dir, false, cancel).await;
        drop(temp_dir);
        let restored = restore_record(mod_dir, saved_record).await;
        let files_extracted = placed?;
        restored?;

        self.emit(ProgressEvent::Stage(InstallStage::WritingMetadata));
        metadata::merge_date_updated(mod_dir, metadata::today())
            .map_err(|e| PipelineError::io(&record_path, e))?;

        hooks::spawn_hooks(&self.hooks, mod_dir);

        let folder = mod_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(InstallReport {
            target: InstallationTarget {
                category_dir: mod_dir.parent().map(Path::to_path_buf).unwrap_or_default(),
                logical_name: paths::strip_disabled_prefix(&folder).to_string(),
                resolved_path: mod_dir.to_path_buf(),
                is_update: true,
            },
            files_extracted,
            backup,
            previews_downloaded: 0,
        })
    }
}

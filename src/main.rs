//! fxmm command line front end

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fxmm::archive::{self, EntryProgress};
use fxmm::catalog::{mod_id_from_url, GameBananaClient, ModCatalog, ModFile, ModSort};
use fxmm::downloaders::HttpClient;
use fxmm::installer::{
    backup, check_for_update, clean, installed_mods, InstallConfig, InstallOptions,
    InstallOutcome, InstallPipeline, InstallRequest, ProgressEvent, ProgressSink, StarterPack,
    UpdateStatus,
};
use fxmm::metadata;
use fxmm::paths;
use fxmm::settings::Settings;

#[derive(Parser)]
#[command(name = "fxmm")]
#[command(version)]
#[command(about = "GameBanana mod installer for XXMI mod libraries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root of the mod library (defaults to the saved setting)
    #[arg(long, global = true, env = "FXMM_MODS_DIR")]
    mods_dir: Option<PathBuf>,

    /// Game tag: ZZMI, GIMI, HIMI, WWMI, SRMI, EFMI (defaults to the saved setting)
    #[arg(long, global = true)]
    game: Option<String>,

    /// Enable verbose logging (use RUST_LOG=debug for more detail)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a mod from its GameBanana URL or id
    Install {
        /// Mod page URL or numeric mod id
        mod_ref: String,

        /// Category folder inside the mod library
        #[arg(short, long, default_value = "")]
        category: String,

        /// Folder name (defaults to the mod's name)
        #[arg(short, long)]
        name: Option<String>,

        #[command(flatten)]
        selection: FileSelection,

        #[command(flatten)]
        flags: OptionFlags,
    },

    /// Update an installed mod from the URL stored in its mod.json
    Update {
        /// Installed mod folder
        mod_dir: PathBuf,

        #[command(flatten)]
        selection: FileSelection,

        #[command(flatten)]
        flags: OptionFlags,
    },

    /// Check installed mods for newer versions on GameBanana
    Check {
        /// Mod folders to check (defaults to every mod in the library)
        mod_dirs: Vec<PathBuf>,
    },

    /// Install the game's starter pack into the mod library
    StarterPack {
        /// Install even if the pack was dismissed before
        #[arg(long)]
        force: bool,

        /// Do not install; stop offering the pack
        #[arg(long, conflicts_with = "force")]
        dismiss: bool,
    },

    /// List mods of a game
    Browse {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[arg(short, long, value_enum, default_value_t = SortArg::Default)]
        sort: SortArg,
    },

    /// Show the files of an archive and the folder that would be stripped
    Inspect {
        archive: PathBuf,
    },

    /// Extract an archive, stripping a single root folder
    Extract {
        archive: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Zip a mod folder into fxmm-backup-NNN.zip
    Backup {
        mod_dir: PathBuf,
    },

    /// Empty a mod folder, keeping backups and (by default) previews
    Clean {
        mod_dir: PathBuf,

        /// Delete preview images as well
        #[arg(long)]
        no_preserve_previews: bool,
    },
}

#[derive(clap::Args)]
struct FileSelection {
    /// File id to install (repeatable; defaults to the newest file)
    #[arg(long = "file")]
    file_ids: Vec<u64>,

    /// Install every file of the mod
    #[arg(long, conflicts_with = "file_ids")]
    all: bool,
}

#[derive(clap::Args)]
struct OptionFlags {
    /// Zip the existing folder before updating it
    #[arg(long)]
    backup: bool,

    /// Empty the existing folder before extracting
    #[arg(long)]
    clean: bool,

    /// Skip downloading preview screenshots
    #[arg(long)]
    no_previews: bool,

    /// Number new previews after the existing ones
    #[arg(long)]
    combine_previews: bool,
}

impl OptionFlags {
    /// Saved defaults with command line switches applied on top
    fn apply(&self, mut options: InstallOptions) -> InstallOptions {
        options.backup |= self.backup;
        options.clean_install |= self.clean;
        options.combine_previews |= self.combine_previews;
        if self.no_previews {
            options.download_previews = false;
        }
        options
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Default,
    New,
    Updated,
}

impl From<SortArg> for ModSort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Default => ModSort::Default,
            SortArg::New => ModSort::New,
            SortArg::Updated => ModSort::Updated,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only initialize logging if verbose or RUST_LOG is set
    if cli.verbose || std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(if cli.verbose {
                    "fxmm=debug".parse()?
                } else {
                    "fxmm=warn".parse()?
                }),
            )
            .init();
    }

    let settings = Settings::load();

    match &cli.command {
        Commands::Install {
            mod_ref,
            category,
            name,
            selection,
            flags,
        } => {
            let config = install_config(&cli, &settings)?;
            let (http, catalog) = catalog_client(&config)?;

            let mod_id = parse_mod_ref(mod_ref)?;
            let record = catalog.mod_details(mod_id).await?;
            let files = select_files(catalog.mod_files(mod_id).await?, selection)?;
            println!("Installing {} ({} file(s))", record.name, files.len());

            let source_url = if record.profile_url.is_empty() {
                format!("https://gamebanana.com/mods/{}", mod_id)
            } else {
                record.profile_url.clone()
            };
            let request = InstallRequest {
                mod_name: name.clone().unwrap_or_else(|| record.name.clone()),
                category: category.clone(),
                files,
                source_url,
                author: record.author.clone().unwrap_or_default(),
                is_nsfw: record.is_nsfw,
                mod_id: Some(mod_id),
                date_updated: record.date_updated,
                previews: record.preview_images.clone(),
                options: flags.apply(settings.install_options()),
            };

            let (bar, sink) = progress_bar()?;
            let pipeline = InstallPipeline::new(config, http, catalog)?.with_progress(sink);
            let cancel = cancel_on_ctrl_c();
            let outcome = pipeline.install(request, &cancel).await;
            bar.finish_and_clear();
            print_outcome(&outcome?);
        }

        Commands::Update {
            mod_dir,
            selection,
            flags,
        } => {
            let config = install_config(&cli, &settings)?;
            let (http, catalog) = catalog_client(&config)?;

            let url = metadata::read_metadata(mod_dir)
                .and_then(|meta| meta.url)
                .with_context(|| format!("{} has no source URL in mod.json", mod_dir.display()))?;
            let mod_id = parse_mod_ref(&url)?;
            let files = select_files(catalog.mod_files(mod_id).await?, selection)?;
            let options = flags.apply(settings.install_options());

            let (bar, sink) = progress_bar()?;
            let pipeline = InstallPipeline::new(config, http, catalog)?.with_progress(sink);
            let cancel = cancel_on_ctrl_c();
            let outcome = pipeline.update(mod_dir, &files, &options, &cancel).await;
            bar.finish_and_clear();
            print_outcome(&outcome?);
        }

        Commands::Check { mod_dirs } => {
            let config = install_config(&cli, &settings)?;
            let (_, catalog) = catalog_client(&config)?;
            let mod_dirs = if mod_dirs.is_empty() {
                installed_mods(&config.mods_root)
            } else {
                mod_dirs.clone()
            };

            let mut available = 0;
            for mod_dir in &mod_dirs {
                let folder = mod_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let marker = if paths::is_disabled(&folder) { " (disabled)" } else { "" };
                let status = match check_for_update(mod_dir, catalog.as_ref()).await {
                    Ok(UpdateStatus::Available { installed, remote }) => {
                        available += 1;
                        format!("update available ({} -> {})", installed, remote)
                    }
                    Ok(UpdateStatus::UpToDate { installed, .. }) => {
                        format!("up to date ({})", installed)
                    }
                    Ok(UpdateStatus::Unknown) => "unknown".to_string(),
                    Err(e) => format!("check failed: {}", e),
                };
                println!(
                    "{}{}: {}",
                    paths::strip_disabled_prefix(&folder),
                    marker,
                    status
                );
            }
            eprintln!("\n{} of {} mod(s) have updates", available, mod_dirs.len());
        }

        Commands::StarterPack { force, dismiss } => {
            let config = install_config(&cli, &settings)?;
            let game = game_tag(&cli, &settings);
            let (http, catalog) = catalog_client(&config)?;

            let (bar, sink) = progress_bar()?;
            let starter = StarterPack::new(config, http, catalog)?
                .with_progress(sink)
                .with_settings_path(Settings::settings_path()?);

            if *dismiss {
                starter.dismiss(&game);
                println!("Starter pack for {} will not be offered again", game);
                return Ok(());
            }
            if !*force && !starter.is_offered(&game) {
                println!("No starter pack offered for {} (use --force to reinstall)", game);
                return Ok(());
            }

            let cancel = cancel_on_ctrl_c();
            let outcome = starter.install(&game, &cancel).await;
            bar.finish_and_clear();
            print_outcome(&outcome?);
        }

        Commands::Browse { page, sort } => {
            let config = InstallConfig::new(".");
            let game = game_tag(&cli, &settings);
            let (_, catalog) = catalog_client(&config)?;

            let listing = catalog.list_mods(&game, *page, (*sort).into()).await?;
            for record in &listing.records {
                println!(
                    "{:>8}  {:<48} {:<20} {}",
                    record.id,
                    record.name,
                    record.author.as_deref().unwrap_or("-"),
                    record
                        .date_updated
                        .map(metadata::format_date)
                        .unwrap_or_else(|| metadata::UNSET_DATE.to_string())
                );
            }
            eprintln!(
                "\nPage {}: {} of {} mods{}",
                page,
                listing.records.len(),
                listing.record_count,
                if listing.is_complete { " (last page)" } else { "" }
            );
        }

        Commands::Inspect { archive: path } => {
            let kind = archive::detect_archive_type(path)?;
            let plan = archive::plan_extraction(path)?;
            for entry in &plan.files {
                println!("{:>12}  {}", entry.size, entry.path);
            }
            eprintln!("\nType:  {:?}", kind);
            eprintln!("Files: {}", plan.total());
            match &plan.strip_root {
                Some(root) => eprintln!("Root:  {}/ (stripped on extraction)", root),
                None => eprintln!("Root:  none"),
            }
        }

        Commands::Extract { archive: path, output } => {
            let (bar, _) = progress_bar()?;
            let report = |processed: usize, total: usize| {
                bar.set_length(total as u64);
                bar.set_position(processed as u64);
            };
            let report_ref: EntryProgress<'_> = &report;
            let summary = archive::extract_archive(path, output, Some(report_ref), None)?;
            bar.finish_and_clear();
            println!(
                "Extracted {} files into {} ({} skipped)",
                summary.files_written,
                output.display(),
                summary.files_skipped
            );
        }

        Commands::Backup { mod_dir } => {
            let path = backup::create_backup(mod_dir)?;
            println!("Backup written to {}", path.display());
        }

        Commands::Clean {
            mod_dir,
            no_preserve_previews,
        } => {
            ensure_dir(mod_dir)?;
            let report = clean::clean_mod_folder(mod_dir, !*no_preserve_previews);
            println!(
                "Deleted {} files and {} folders, kept {}",
                report.deleted_files, report.deleted_dirs, report.kept_files
            );
            if report.failures > 0 {
                println!("{} item(s) could not be removed", report.failures);
            }
        }
    }

    Ok(())
}

fn install_config(cli: &Cli, settings: &Settings) -> Result<InstallConfig> {
    let mods_root = match &cli.mods_dir {
        Some(dir) => dir.clone(),
        None if !settings.mods_dir.is_empty() => PathBuf::from(&settings.mods_dir),
        None => bail!("No mod library configured; pass --mods-dir or set mods_dir in settings"),
    };
    let config = InstallConfig::new(mods_root);
    config.validate()?;
    Ok(config)
}

fn game_tag(cli: &Cli, settings: &Settings) -> String {
    match &cli.game {
        Some(tag) => tag.to_uppercase(),
        None if !settings.game_tag.is_empty() => settings.game_tag.clone(),
        None => "ZZMI".to_string(),
    }
}

fn catalog_client(config: &InstallConfig) -> Result<(HttpClient, Arc<dyn ModCatalog>)> {
    let http = HttpClient::with_user_agent(&config.user_agent)?;
    let catalog = GameBananaClient::new(http.clone(), config.game_ids.clone());
    Ok((http, Arc::new(catalog)))
}

fn parse_mod_ref(mod_ref: &str) -> Result<u64> {
    mod_ref
        .trim()
        .parse()
        .ok()
        .or_else(|| mod_id_from_url(mod_ref))
        .with_context(|| format!("Not a GameBanana mod URL or id: {}", mod_ref))
}

/// Pick the files to install: explicit ids, every file, or the newest one
fn select_files(files: Vec<ModFile>, selection: &FileSelection) -> Result<Vec<ModFile>> {
    if selection.all {
        return Ok(files);
    }

    if !selection.file_ids.is_empty() {
        let mut picked = Vec::with_capacity(selection.file_ids.len());
        for id in &selection.file_ids {
            let file = files
                .iter()
                .find(|f| f.id == *id)
                .with_context(|| format!("Mod has no file with id {}", id))?;
            picked.push(file.clone());
        }
        return Ok(picked);
    }

    Ok(files.into_iter().max_by_key(|f| f.date_added).into_iter().collect())
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("{} is not a directory", path.display());
    }
    Ok(())
}

/// Cancel the returned token on Ctrl+C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            trigger.cancel();
        }
    });
    cancel
}

fn progress_bar() -> Result<(ProgressBar, ProgressSink)> {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} | {msg}",
            )?
            .progress_chars("=>-"),
    );

    let bar = pb.clone();
    let sink: ProgressSink = Arc::new(move |event| match event {
        ProgressEvent::Stage(stage) => bar.set_message(format!("{:?}", stage)),
        ProgressEvent::Download {
            file_name,
            index,
            count,
            percent,
        } => {
            bar.set_length(100);
            bar.set_position(percent as u64);
            bar.set_message(format!("Downloading {} ({}/{})", file_name, index + 1, count));
        }
        ProgressEvent::Extract {
            file_name,
            processed,
            total,
        } => {
            bar.set_length(total as u64);
            bar.set_position(processed as u64);
            bar.set_message(format!("Extracting {}", file_name));
        }
        ProgressEvent::Failed { message } => bar.abandon_with_message(message),
    });

    Ok((pb, sink))
}

fn print_outcome(outcome: &InstallOutcome) {
    match outcome {
        InstallOutcome::Cancelled => println!("Cancelled, nothing was installed"),
        InstallOutcome::Completed(report) => {
            let verb = if report.target.is_update { "Updated" } else { "Installed" };
            println!(
                "{} {} into {} ({} files)",
                verb,
                report.target.logical_name,
                report.target.resolved_path.display(),
                report.files_extracted
            );
            if let Some(backup) = &report.backup {
                println!("Backup: {}", backup.display());
            }
            if report.previews_downloaded > 0 {
                println!("Previews: {}", report.previews_downloaded);
            }
        }
    }
}

//! Post-install hooks.
//!
//! Work that may follow an install (image optimisation, index refreshes)
//! runs in the background after the pipeline reports completion. A failing
//! hook is logged and never affects the install result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[async_trait]
pub trait PostInstallHook: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn run(&self, mod_dir: &Path) -> anyhow::Result<()>;
}

/// Start every hook for `mod_dir` in the background.
///
/// The handles are returned for callers that want to wait; the pipeline
/// drops them.
pub fn spawn_hooks(hooks: &[Arc<dyn PostInstallHook>], mod_dir: &Path) -> Vec<JoinHandle<()>> {
    hooks
        .iter()
        .map(|hook| {
            let hook = Arc::clone(hook);
            let mod_dir: PathBuf = mod_dir.to_path_buf();
            tokio::spawn(async move {
                match hook.run(&mod_dir).await {
                    Ok(()) => debug!("Hook {} finished for {}", hook.name(), mod_dir.display()),
                    Err(e) => warn!(
                        "Hook {} failed for {}: {:#}",
                        hook.name(),
                        mod_dir.display(),
                        e
                    ),
                }
            })
        })
        .collect()
}

//! HTTP client with per-chunk progress and cooperative cancellation

use anyhow::{Context, Result};
use futures::StreamExt;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{truncate_url, DownloadError, DownloadTask};

/// Connection timeout: time to establish TCP connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read timeout: maximum time to wait for data between chunks
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Progress callback receiving the completed percentage (0-100)
pub type PercentCallback<'a> = &'a (dyn Fn(f64) + Send + Sync);

/// Shared HTTP client
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_user_agent(concat!("FlairX-Mod-Manager/", env!("CARGO_PKG_VERSION")))
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Wrap an already configured reqwest client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Stream a remote file to disk.
///
/// Progress is reported after every received chunk when the total size is
/// known (from `Content-Length`, else from the task's expected size). The
/// token is checked between chunks; the chunk being written is always
/// finished first.
///
/// On any error, including cancellation, the destination may be left
/// partially written and the caller is responsible for removing it.
pub async fn download_file(
    client: &HttpClient,
    task: &DownloadTask,
    progress: Option<PercentCallback<'_>>,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError> {
    if cancel.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }

    if let Some(parent) = task.destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
        response = client.inner().get(&task.url).send() => response?,
    };

    let status = response.status();
    if !status.is_success() {
        warn!("Download failed with HTTP {}: {}", status.as_u16(), truncate_url(&task.url));
        return Err(DownloadError::Http {
            status: status.as_u16(),
            url: truncate_url(&task.url),
        });
    }

    let total_size = response
        .content_length()
        .or(task.expected_size)
        .filter(|size| *size > 0);

    let mut file = File::create(&task.destination).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = file.flush().await;
                debug!(
                    "Download cancelled after {} bytes: {}",
                    downloaded,
                    truncate_url(&task.url)
                );
                return Err(DownloadError::Cancelled);
            }
            chunk = stream.next() => chunk,
        };

        let Some(chunk) = next else { break };
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if let (Some(report), Some(total)) = (progress, total_size) {
            report((downloaded as f64 / total as f64 * 100.0).min(100.0));
        }
    }

    file.flush().await?;

    debug!(
        "Downloaded {} bytes to {}",
        downloaded,
        task.destination.display()
    );
    Ok(downloaded)
}

/// Fetch a small resource (preview image, API payload) into memory
pub async fn fetch_bytes(
    client: &HttpClient,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, DownloadError> {
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
        response = client.inner().get(url).send() => response?,
    };

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Http {
            status: status.as_u16(),
            url: truncate_url(url),
        });
    }

    let bytes = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
        bytes = response.bytes() => bytes?,
    };
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, test_client, Route};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new();
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_download_writes_file_and_reports_progress() {
        let body = vec![7u8; 64 * 1024];
        let base = serve(vec![Route::ok("/mod.zip", body.clone())]).await;
        let dir = tempdir().unwrap();
        let task = DownloadTask::new(format!("{}/mod.zip", base), dir.path().join("mod.zip"));

        let reported = Mutex::new(Vec::new());
        let progress = |pct: f64| reported.lock().unwrap().push(pct);
        let progress_ref: PercentCallback<'_> = &progress;

        let cancel = CancellationToken::new();
        let bytes = download_file(&test_client(), &task, Some(progress_ref), &cancel)
            .await
            .unwrap();

        assert_eq!(bytes, body.len() as u64);
        assert_eq!(std::fs::read(&task.destination).unwrap(), body);
        let reported = reported.lock().unwrap();
        assert!(!reported.is_empty());
        assert!(reported.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*reported.last().unwrap(), 100.0);
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let base = serve(vec![]).await;
        let dir = tempdir().unwrap();
        let task = DownloadTask::new(format!("{}/missing.zip", base), dir.path().join("x.zip"));

        let err = download_file(&test_client(), &task, None, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Http { status: 404, .. }));
        assert!(!err.is_cancelled());
    }

    #[tokio::test]
    async fn test_download_cancelled_before_start() {
        let dir = tempdir().unwrap();
        let task = DownloadTask::new("http://127.0.0.1:9/never", dir.path().join("x.zip"));
        let token = CancellationToken::new();
        token.cancel();

        let err = download_file(&test_client(), &task, None, &token).await.unwrap_err();

        assert!(err.is_cancelled());
        assert!(!task.destination.exists());
    }

    #[tokio::test]
    async fn test_download_cancelled_mid_transfer() {
        let base = serve(vec![Route::stalled("/big.7z", vec![1u8; 4096], 1 << 20)]).await;
        let dir = tempdir().unwrap();
        let task = DownloadTask::new(format!("{}/big.7z", base), dir.path().join("big.7z"));

        let token = CancellationToken::new();
        let trigger = token.clone();
        let progress = move |_pct: f64| trigger.cancel();
        let progress_ref: PercentCallback<'_> = &progress;

        let err = download_file(&test_client(), &task, Some(progress_ref), &token)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_fetch_bytes() {
        let base = serve(vec![Route::ok("/img.jpg", b"jpegdata".to_vec())]).await;
        let url = format!("{}/img.jpg", base);
        let data = fetch_bytes(&test_client(), &url, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(data, b"jpegdata");
    }
}

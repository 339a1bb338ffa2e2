//! Shared fixtures for unit tests: a loopback HTTP responder and archive
//! builders.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::downloaders::HttpClient;

/// A canned response for one request path
#[derive(Clone)]
pub struct Route {
    path: String,
    status: u16,
    body: Vec<u8>,
    /// Content-Length announced instead of the real body length, after
    /// which the connection hangs
    stall_with_length: Option<usize>,
}

impl Route {
    pub fn ok(path: &str, body: Vec<u8>) -> Self {
        Self {
            path: path.to_string(),
            status: 200,
            body,
            stall_with_length: None,
        }
    }

    pub fn status(path: &str, status: u16) -> Self {
        Self {
            path: path.to_string(),
            status,
            body: Vec::new(),
            stall_with_length: None,
        }
    }

    pub fn stalled(path: &str, first_chunk: Vec<u8>, announced: usize) -> Self {
        Self {
            path: path.to_string(),
            status: 200,
            body: first_chunk,
            stall_with_length: Some(announced),
        }
    }
}

/// Serve the given routes on an ephemeral loopback port, returning the base
/// URL (`http://127.0.0.1:port`). Unknown paths answer 404.
pub async fn serve(routes: Vec<Route>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                let route = routes.iter().find(|r| r.path == path).cloned();
                let route = route.unwrap_or_else(|| Route::status(&path, 404));
                let length = route.stall_with_length.unwrap_or(route.body.len());
                let header = format!(
                    "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    route.status, length
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&route.body).await;
                let _ = socket.flush().await;
                if route.stall_with_length.is_some() {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            });
        }
    });

    format!("http://{}", addr)
}

/// Client that never goes through a proxy, so loopback servers are reached
/// directly.
pub fn test_client() -> HttpClient {
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    HttpClient::from_client(client)
}

/// Build an in-memory zip archive
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

/// Write a zip archive to disk
pub fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let mut file = File::create(path).unwrap();
    file.write_all(&zip_bytes(files)).unwrap();
}

/// Build an uncompressed tar stream
pub fn tar_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Write a 7z archive to disk, one LZMA2 entry per file
pub fn write_7z(path: &Path, files: &[(&str, &[u8])]) {
    let mut writer = sevenz_rust2::ArchiveWriter::create(path).unwrap();
    for (name, data) in files {
        writer
            .push_archive_entry(sevenz_rust2::ArchiveEntry::new_file(name), Some(*data))
            .unwrap();
    }
    writer.finish().unwrap();
}

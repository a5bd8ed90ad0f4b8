//! Where service-record payloads come from.
//!
//! Each [`DataSource`] call fetches one file by name and returns its raw
//! bytes. Fetches are one-shot: no retry and no caching; a failure surfaces
//! as a [`LoadError`] and the caller decides what to show.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, error};

use crate::error::LoadError;

/// Fetches a named data file.
pub trait DataSource: Send + Sync {
    fn fetch<'a>(&'a self, file_name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>>;
}

/// Pick a source for a configured base: an `http(s)://` URL is fetched over
/// HTTP, anything else is read as a local directory.
///
/// URLs need the `http` feature; without it they fail with
/// [`LoadError::Request`].
pub fn source_for_base(base_path: &str) -> Result<Arc<dyn DataSource>, LoadError> {
    let is_url = base_path.starts_with("http://") || base_path.starts_with("https://");
    if !is_url {
        debug!("[FileSource] reading data files from {}", base_path);
        return Ok(Arc::new(FileSource::new(base_path)));
    }

    #[cfg(feature = "http")]
    {
        Ok(Arc::new(HttpSource::new(base_path)?))
    }
    #[cfg(not(feature = "http"))]
    {
        error!("[HttpSource] {} needs the `http` feature", base_path);
        Err(LoadError::Request(format!("HTTP data source disabled, cannot fetch {}", base_path)))
    }
}

// ============================================================================
// File system
// ============================================================================

/// Reads files relative to a base directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    base_dir: PathBuf,
}

impl FileSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }
}

impl DataSource for FileSource {
    fn fetch<'a>(&'a self, file_name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        async move {
            let path = self.base_dir.join(file_name);
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    debug!("[FileSource] read {} ({} bytes)", path.display(), bytes.len());
                    Ok(bytes)
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    error!("[FileSource] missing {}", path.display());
                    Err(LoadError::NotFound(path.display().to_string()))
                }
                Err(e) => {
                    error!("[FileSource] failed to read {}: {}", path.display(), e);
                    Err(LoadError::Io(e))
                }
            }
        }
        .boxed()
    }
}

// ============================================================================
// In memory
// ============================================================================

/// Serves byte blobs registered by file name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(file_name.into(), contents.into());
        self
    }
}

impl DataSource for MemorySource {
    fn fetch<'a>(&'a self, file_name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
        let result = self
            .files
            .get(file_name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(file_name.to_string()));
        futures::future::ready(result).boxed()
    }
}

// ============================================================================
// HTTP
// ============================================================================

#[cfg(feature = "http")]
pub use self::http::HttpSource;

#[cfg(feature = "http")]
mod http {
    use std::time::{Duration, Instant};

    use futures::future::BoxFuture;
    use futures::FutureExt;
    use log::{error, info};
    use reqwest::Client;

    use super::DataSource;
    use crate::error::LoadError;

    /// Fetches files with a GET relative to a base URL.
    pub struct HttpSource {
        client: Client,
        base_url: String,
    }

    impl HttpSource {
        /// Create a source rooted at `base_url` (e.g. `https://host/data/geojson`).
        pub fn new(base_url: &str) -> Result<Self, LoadError> {
            let client = Client::builder()
                .pool_idle_timeout(Duration::from_secs(60))
                .tcp_keepalive(Duration::from_secs(30))
                .build()
                .map_err(|e| LoadError::Request(format!("Failed to create HTTP client: {}", e)))?;

            Ok(Self {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            })
        }

        fn url_for(&self, file_name: &str) -> String {
            format!("{}/{}", self.base_url, file_name.trim_start_matches('/'))
        }
    }

    impl DataSource for HttpSource {
        fn fetch<'a>(&'a self, file_name: &'a str) -> BoxFuture<'a, Result<Vec<u8>, LoadError>> {
            async move {
                let url = self.url_for(file_name);
                let req_start = Instant::now();

                let resp = self.client.get(&url).send().await.map_err(|e| {
                    error!("[HttpSource] request to {} failed: {}", url, e);
                    LoadError::Request(e.to_string())
                })?;
                let headers_elapsed = req_start.elapsed();

                let status = resp.status();
                if !status.is_success() {
                    error!("[HttpSource] HTTP {} for {}", status, url);
                    return Err(LoadError::Http { status: status.as_u16(), url });
                }

                let bytes = resp.bytes().await.map_err(|e| {
                    error!("[HttpSource] body download from {} failed: {}", url, e);
                    LoadError::Request(format!("Body download error: {}", e))
                })?;

                info!(
                    "[HttpSource] {} headers={:?} total={:?} ({:.1}KB)",
                    url,
                    headers_elapsed,
                    req_start.elapsed(),
                    bytes.len() as f64 / 1024.0
                );

                Ok(bytes.to_vec())
            }
            .boxed()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        /// Answer a single request with `response`; returns the base URL.
        async fn serve_once(response: &'static [u8]) -> String {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                socket.write_all(response).await.unwrap();
                let _ = socket.shutdown().await;
            });
            format!("http://{}/data", addr)
        }

        #[test]
        fn test_url_joining() {
            let source = HttpSource::new("https://example.org/data/geojson/").unwrap();
            assert_eq!(source.url_for("a.json"), "https://example.org/data/geojson/a.json");
            assert_eq!(source.url_for("/a.json"), "https://example.org/data/geojson/a.json");
        }

        #[tokio::test]
        async fn test_non_success_status_is_http_error() {
            let base = serve_once(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n").await;
            let source = HttpSource::new(&base).unwrap();

            match source.fetch("day.json").await {
                Err(LoadError::Http { status, url }) => {
                    assert_eq!(status, 404);
                    assert_eq!(url, format!("{}/day.json", base));
                }
                other => panic!("expected HTTP error, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_success_returns_body() {
            let base = serve_once(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\n[]").await;
            let source = HttpSource::new(&base).unwrap();
            assert_eq!(source.fetch("day.json").await.unwrap(), b"[]".to_vec());
        }
    }
}

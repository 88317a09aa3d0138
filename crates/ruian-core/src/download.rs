//! Fetching the monthly CUZK export over HTTP.

use std::time::{Duration, Instant};

use tracing::info;

use crate::error::{Result, RuianError};

const USER_AGENT: &str = concat!("ruian/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ArchiveDownloader {
    client: reqwest::Client,
}

impl ArchiveDownloader {
    /// `timeout` bounds the whole transfer, connecting included.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Download `url` into memory. Any non-success status is an error.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        info!("Downloading from: {url}");
        let started = Instant::now();

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RuianError::Download {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let bytes = response.bytes().await?;
        info!(
            "Downloaded {:.2} MB in {:.2}s",
            bytes.len() as f64 / (1024.0 * 1024.0),
            started.elapsed().as_secs_f64()
        );
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return its URL.
    async fn serve_once(status: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/20250228_OB_ADR_csv.zip")
    }

    fn downloader() -> ArchiveDownloader {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        ArchiveDownloader::with_client(client)
    }

    #[tokio::test]
    async fn test_download_returns_body() {
        let url = serve_once("200 OK", b"PK\x03\x04payload").await;
        let bytes = downloader().download(&url).await.unwrap();
        assert_eq!(bytes, b"PK\x03\x04payload");
    }

    #[tokio::test]
    async fn test_download_rejects_error_status() {
        let url = serve_once("404 Not Found", b"missing").await;
        let err = downloader().download(&url).await.unwrap_err();
        match err {
            RuianError::Download { url: failed, message } => {
                assert_eq!(failed, url);
                assert_eq!(message, "HTTP 404");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_new_builds_client() {
        assert!(ArchiveDownloader::new(Duration::from_secs(5)).is_ok());
    }
}

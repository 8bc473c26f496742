//! Network acquisition of media.
//!
//! Part constructors depend only on the [`Downloader`] trait; the default
//! [`HttpDownloader`] streams responses with `reqwest` and enforces the MIME
//! allow-list before the first body byte is written to the sink.

use std::time::Duration;

use async_trait::async_trait;
use multimodal_common::{mime, Error, Result};
use reqwest::header::CONTENT_TYPE;
use tempfile::NamedTempFile;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::FetchConfig;

/// Allow-list used by audio, image and video fetches when none is given.
pub const DEFAULT_ALLOWED_MIME: &[&str] = &["image/*", "audio/*", "video/*"];

/// Content type assumed when a server sends none.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Owned copy of [`DEFAULT_ALLOWED_MIME`].
pub fn default_allowed_mime() -> Vec<String> {
    DEFAULT_ALLOWED_MIME.iter().map(|s| s.to_string()).collect()
}

/// Transport capability used by every `from_url` constructor.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Stream `url` into `sink` and return the resolved MIME type.
    ///
    /// Fails with [`Error::MediaFormat`] when the response's content type
    /// matches none of `allowed_mime`; nothing is written in that case.
    async fn download(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        allowed_mime: &[String],
    ) -> Result<String>;

    /// Resolve the MIME type of a URL without downloading it.
    ///
    /// The URL's path extension is consulted first; the network is only
    /// asked when that yields nothing.
    async fn probe_mime(&self, url: &str) -> Result<String>;
}

/// [`Downloader`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    /// Create a downloader with the default fetch settings.
    pub fn new() -> Result<Self> {
        Self::from_config(&FetchConfig::default())
    }

    /// Create a downloader honoring the `[fetch]` config section.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn content_type(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(mime::essence)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
        allowed_mime: &[String],
    ) -> Result<String> {
        if allowed_mime.is_empty() {
            return Err(Error::configuration("Expected at least one allowed MIME type"));
        }
        tracing::debug!("Downloading media from url: {}", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::http(e.to_string()))?;

        let mime = content_type(&response);
        if !mime::matches_any(allowed_mime, &mime) {
            return Err(Error::media_format(mime, allowed_mime));
        }

        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::http(e.to_string()))?
        {
            sink.write_all(&chunk).await?;
            written += chunk.len();
        }
        sink.flush().await?;

        tracing::debug!("Downloaded {} bytes ({}) from {}", written, mime, url);
        Ok(mime)
    }

    async fn probe_mime(&self, url: &str) -> Result<String> {
        if let Some(guess) = mime::guess_from_url(url) {
            return Ok(guess.to_string());
        }

        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| Error::http(e.to_string()))?;
        Ok(content_type(&response))
    }
}

/// Download into memory. Used by parts that normalize on construction.
pub async fn fetch_to_memory(
    downloader: &dyn Downloader,
    url: &str,
    allowed_mime: &[String],
) -> Result<(Vec<u8>, String)> {
    let mut buf = Vec::new();
    let mime = downloader.download(url, &mut buf, allowed_mime).await?;
    Ok((buf, mime))
}

/// Download into a named temporary file.
///
/// The file is deleted when the returned handle is dropped, including when
/// the future is cancelled or the download fails midway.
pub async fn fetch_to_tempfile(
    downloader: &dyn Downloader,
    url: &str,
    allowed_mime: &[String],
) -> Result<(NamedTempFile, String)> {
    let temp = tempfile::Builder::new()
        .prefix("multimodal-")
        .tempfile()?;
    let mut sink = tokio::fs::File::from_std(temp.reopen()?);
    let mime = downloader.download(url, &mut sink, allowed_mime).await?;
    sink.sync_all().await?;
    Ok((temp, mime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allowed_mime() {
        assert_eq!(
            default_allowed_mime(),
            vec!["image/*".to_string(), "audio/*".to_string(), "video/*".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_allow_list_is_configuration_error() {
        let downloader = HttpDownloader::new().unwrap();
        let mut sink = Vec::new();
        let err = downloader
            .download("http://127.0.0.1:9/never", &mut sink, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_probe_mime_prefers_extension() {
        let downloader = HttpDownloader::new().unwrap();
        // No request is made, so an unroutable host is fine.
        let mime = downloader
            .probe_mime("http://127.0.0.1:9/media/cat.PNG?x=1")
            .await
            .unwrap();
        assert_eq!(mime, "image/png");
    }
}

//! Video parts: binary content plus lazily probed metadata.

use std::fmt;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use multimodal_av::{Capabilities, FrameRequest, VideoMetadata};
use multimodal_common::{mime, Error, Extra, Resolution, Result};
use ndarray::Array4;
use parking_lot::Mutex;

use super::BinaryPart;
use crate::fetch::Downloader;

/// A video stored exactly like a [`BinaryPart`], never decoded in memory.
///
/// [`duration`](Self::duration) and [`resolution`](Self::resolution) share a
/// single probe whose result is cached for the life of the part. A failed
/// probe caches nothing, so the next access tries again.
pub struct VideoPart {
    binary: BinaryPart,
    metadata: Mutex<Option<VideoMetadata>>,
    capabilities: Option<Capabilities>,
}

impl From<BinaryPart> for VideoPart {
    fn from(binary: BinaryPart) -> Self {
        Self {
            binary,
            metadata: Mutex::new(None),
            capabilities: None,
        }
    }
}

impl VideoPart {
    pub fn from_file(path: impl AsRef<Path>, mime: Option<&str>) -> Result<Self> {
        BinaryPart::from_file(path, mime).map(Self::from)
    }

    pub fn from_handle(file: std::fs::File, mime: Option<&str>) -> Result<Self> {
        BinaryPart::from_handle(file, mime).map(Self::from)
    }

    pub fn from_reader<R: Read + Seek + Send + 'static>(reader: R, mime: Option<&str>) -> Result<Self> {
        BinaryPart::from_reader(reader, mime).map(Self::from)
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>, mime: &str) -> Result<Self> {
        BinaryPart::from_bytes(data, mime).map(Self::from)
    }

    pub fn from_b64(data: &str, mime: &str) -> Result<Self> {
        BinaryPart::from_b64(data, mime).map(Self::from)
    }

    pub fn from_b64_uri(uri: &str) -> Result<Self> {
        BinaryPart::from_b64_uri(uri).map(Self::from)
    }

    /// Download into a temporary file. `allowed_mime` defaults to
    /// `["video/*"]`.
    pub async fn from_url(
        downloader: &dyn Downloader,
        url: &str,
        allowed_mime: Option<&[String]>,
    ) -> Result<Self> {
        let videos_only = ["video/*".to_string()];
        let allowed = allowed_mime.unwrap_or(&videos_only);
        BinaryPart::from_url(downloader, url, Some(allowed))
            .await
            .map(Self::from)
    }

    /// Use these capabilities instead of the process-wide defaults.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.binary.extra = extra;
        self
    }

    fn capabilities(&self) -> &Capabilities {
        self.capabilities
            .as_ref()
            .unwrap_or_else(|| Capabilities::system())
    }

    /// The underlying byte-stream part.
    pub fn binary(&self) -> &BinaryPart {
        &self.binary
    }

    pub fn extra(&self) -> &Extra {
        &self.binary.extra
    }

    pub fn extra_mut(&mut self) -> &mut Extra {
        &mut self.binary.extra
    }

    pub fn mime(&self) -> &str {
        self.binary.mime()
    }

    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        self.binary.as_bytes()
    }

    pub fn as_b64(&self) -> Result<String> {
        self.binary.as_b64()
    }

    pub fn as_b64_uri(&self) -> Result<String> {
        self.binary.as_b64_uri()
    }

    /// See [`BinaryPart::filesize`] for the stream-position caveat.
    pub fn filesize(&self) -> Result<u64> {
        self.binary.filesize()
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.binary.path()
    }

    /// Duration and resolution, probing on first call.
    pub fn metadata(&self) -> Result<VideoMetadata> {
        let mut cached = self.metadata.lock();
        if let Some(metadata) = *cached {
            return Ok(metadata);
        }

        let prober = self.capabilities().video_prober()?;
        let metadata = self.binary.with_probe_input(|input| prober.probe(input))?;
        log_probe(&metadata);
        *cached = Some(metadata);
        Ok(metadata)
    }

    /// [`metadata`](Self::metadata) with the probe run on the blocking pool.
    async fn metadata_blocking(&self) -> Result<VideoMetadata> {
        let cached = *self.metadata.lock();
        if let Some(metadata) = cached {
            return Ok(metadata);
        }

        let capabilities = self.capabilities().clone();
        capabilities.video_prober()?;
        let source = self.binary.detach()?;
        let metadata = run_blocking(move || {
            capabilities.video_prober()?.probe(source.probe_input())
        })
        .await?;
        log_probe(&metadata);
        *self.metadata.lock() = Some(metadata);
        Ok(metadata)
    }

    /// Duration in seconds.
    pub fn duration(&self) -> Result<f64> {
        Ok(self.metadata()?.duration)
    }

    /// Resolution of the first video stream.
    pub fn resolution(&self) -> Result<Resolution> {
        Ok(self.metadata()?.resolution)
    }

    /// Frames sampled at `fps` within `[start, end]` as a
    /// time x channel x height x width array of RGB values.
    ///
    /// Fails with [`Error::CapabilityUnavailable`] when no frame sampler is
    /// installed.
    pub async fn as_tensor(
        &self,
        fps: f64,
        start: Option<f64>,
        end: Option<f64>,
    ) -> Result<Array4<u8>> {
        let sampler = self.capabilities().frame_sampler()?;
        let resolution = self.metadata_blocking().await?.resolution;
        let request = FrameRequest {
            fps,
            start,
            end,
            resolution,
        };
        request.validate()?;

        // Samplers read from a path; spill in-memory parts to disk first.
        let mut spilled = None;
        let path = match self.binary.path() {
            Some(path) => path,
            None => {
                let suffix = mime::extensions_for(self.mime())
                    .first()
                    .map(|ext| format!(".{ext}"))
                    .unwrap_or_default();
                let source = self.binary.detach()?;
                let temp = run_blocking(move || {
                    let mut temp = tempfile::Builder::new()
                        .prefix("multimodal-video-")
                        .suffix(&suffix)
                        .tempfile()?;
                    source.copy_to(&mut temp)?;
                    temp.flush()?;
                    Ok(temp)
                })
                .await?;
                let path = temp.path().to_path_buf();
                spilled = Some(temp);
                path
            }
        };

        let sampled = sampler.sample(&path, &request).await;
        drop(spilled);
        let sampled = sampled?;
        frames_to_tensor(sampled.frames, sampled.resolution)
    }
}

fn log_probe(metadata: &VideoMetadata) {
    tracing::debug!(
        "Probed video: {:.3}s at {}",
        metadata.duration,
        metadata.resolution
    );
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(format!("Task join error: {}", e))))?
}

/// Stack packed RGB24 frames into a `(t, 3, h, w)` array.
fn frames_to_tensor(frames: Vec<Vec<u8>>, resolution: Resolution) -> Result<Array4<u8>> {
    let (w, h) = (resolution.width as usize, resolution.height as usize);
    let frame_len = resolution.rgb24_frame_len();
    let t = frames.len();

    let mut flat = Vec::with_capacity(t * frame_len);
    for (i, frame) in frames.into_iter().enumerate() {
        if frame.len() != frame_len {
            return Err(Error::format(format!(
                "frame {i} has {} bytes, expected {frame_len}",
                frame.len()
            )));
        }
        flat.extend(frame);
    }

    let thwc = Array4::from_shape_vec((t, h, w, 3), flat)
        .map_err(|e| Error::format(format!("frame buffer does not match shape: {e}")))?;
    Ok(thwc
        .permuted_axes([0, 3, 1, 2])
        .as_standard_layout()
        .into_owned())
}

impl fmt::Debug for VideoPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoPart")
            .field("binary", &self.binary)
            .field("metadata", &*self.metadata.lock())
            .finish()
    }
}

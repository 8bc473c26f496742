//! Frame sampling via the ffmpeg CLI.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use multimodal_common::{Error, Result};
use tokio::process::Command;

use crate::capability::{FrameRequest, FrameSampler, SampledFrames};
use crate::tools::spawn_error;

/// [`FrameSampler`] that pipes raw RGB24 frames out of ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSampler {
    ffmpeg: PathBuf,
}

impl FfmpegFrameSampler {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }
}

fn build_args(path: &Path, request: &FrameRequest) -> Vec<String> {
    let mut args: Vec<String> = vec!["-v".into(), "error".into(), "-nostdin".into()];
    if let Some(start) = request.start {
        args.extend(["-ss".into(), start.to_string()]);
    }
    args.extend(["-i".into(), path.to_string_lossy().into_owned()]);
    if let Some(end) = request.end {
        let span = end - request.start.unwrap_or(0.0);
        args.extend(["-t".into(), span.to_string()]);
    }
    let res = request.resolution;
    args.extend([
        "-vf".into(),
        format!("fps={},scale={}:{}", request.fps, res.width, res.height),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "pipe:1".into(),
    ]);
    args
}

/// Split a packed RGB24 byte stream into whole frames, dropping a trailing
/// partial frame.
fn split_frames(raw: Vec<u8>, frame_len: usize) -> Vec<Vec<u8>> {
    if frame_len == 0 {
        return Vec::new();
    }
    raw.chunks_exact(frame_len).map(<[u8]>::to_vec).collect()
}

#[async_trait]
impl FrameSampler for FfmpegFrameSampler {
    async fn sample(&self, path: &Path, request: &FrameRequest) -> Result<SampledFrames> {
        request.validate()?;

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(build_args(path, request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Sampling {} at {} fps ({:?}..{:?})",
            path.display(),
            request.fps,
            request.start,
            request.end
        );

        let output = cmd
            .output()
            .await
            .map_err(|e| spawn_error("ffmpeg", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::tool_failed("ffmpeg", stderr.trim().to_string()));
        }

        Ok(SampledFrames {
            resolution: request.resolution,
            frames: split_frames(output.stdout, request.resolution.rgb24_frame_len()),
        })
    }
}

//! FFprobe-based media probing.

use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use multimodal_common::{Error, Resolution, Result};
use serde::Deserialize;

use crate::capability::{ProbeInput, VideoMetadata, VideoProber};
use crate::tools::run_captured;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    sample_rate: Option<String>,
}

/// [`VideoProber`] backed by the ffprobe CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    path: PathBuf,
}

impl FfprobeProber {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "format=duration:stream=width,height",
            "-of",
            "json",
            "-",
        ]);
        cmd
    }
}

impl VideoProber for FfprobeProber {
    fn probe(&self, input: ProbeInput<'_>) -> Result<VideoMetadata> {
        let mut cmd = self.command();
        let stdout = match input {
            ProbeInput::File(file) => {
                // The duplicated descriptor shares the read offset.
                let mut handle = file;
                handle.seek(SeekFrom::Start(0))?;
                cmd.stdin(Stdio::from(file.try_clone()?));
                run_captured("ffprobe", &mut cmd, None)?
            }
            ProbeInput::Bytes(bytes) => run_captured("ffprobe", &mut cmd, Some(bytes))?,
        };
        parse_video_metadata(&stdout)
    }
}

fn parse_output(stdout: &[u8]) -> Result<FfprobeOutput> {
    let json_str = std::str::from_utf8(stdout)
        .map_err(|e| Error::parse("ffprobe", format!("Invalid UTF-8: {}", e)))?;
    serde_json::from_str(json_str).map_err(|e| Error::parse("ffprobe", e.to_string()))
}

fn parse_video_metadata(stdout: &[u8]) -> Result<VideoMetadata> {
    let output = parse_output(stdout)?;

    let duration = output
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| Error::parse("ffprobe", "missing format duration"))?;
    let duration: f64 = duration
        .trim()
        .parse()
        .map_err(|_| Error::parse("ffprobe", format!("invalid duration {duration:?}")))?;

    let stream = output
        .streams
        .first()
        .ok_or_else(|| Error::parse("ffprobe", "no video stream found"))?;
    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        return Err(Error::parse("ffprobe", "video stream has no dimensions"));
    };

    Ok(VideoMetadata {
        duration,
        resolution: Resolution::new(width, height),
    })
}

/// Sample rate of the first audio stream of a file.
pub fn probe_audio_sample_rate(ffprobe: &Path, path: &Path) -> Result<u32> {
    let mut cmd = Command::new(ffprobe);
    cmd.args([
        "-v",
        "error",
        "-select_streams",
        "a:0",
        "-show_entries",
        "stream=sample_rate",
        "-of",
        "json",
    ])
    .arg(path);

    let stdout = run_captured("ffprobe", &mut cmd, None)?;
    parse_sample_rate(&stdout)
}

fn parse_sample_rate(stdout: &[u8]) -> Result<u32> {
    let output = parse_output(stdout)?;
    output
        .streams
        .first()
        .and_then(|s| s.sample_rate.as_deref())
        .and_then(|s| s.trim().parse().ok())
        .filter(|&sr: &u32| sr > 0)
        .ok_or_else(|| Error::parse("ffprobe", "no audio stream with a sample rate"))
}

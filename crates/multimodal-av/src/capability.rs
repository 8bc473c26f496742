//! Capability traits and the registry that hands them to part types.

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use multimodal_common::{Error, Resolution, Result};
use serde::{Deserialize, Serialize};

use crate::decode::FfmpegAudioDecoder;
use crate::frames::FfmpegFrameSampler;
use crate::probe::FfprobeProber;
use crate::tools::{ToolRegistry, ToolsConfig};

/// Audio handed to an [`AudioDecoder`].
#[derive(Debug, Clone, Copy)]
pub enum AudioInput<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

/// Hints that disambiguate an audio source.
///
/// `format` and `codec` are passed to the container decoder; `sample_rate`,
/// `sample_width` and `channels` describe headerless PCM input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeHints {
    /// Container format name (`"wav"`, `"mp3"`, `"pcm"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Codec name, for containers that need it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    /// Extra converter arguments, passed through verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    /// Bytes per sample for raw PCM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_width: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
}

impl DecodeHints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn with_parameters<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.extend(params.into_iter().map(Into::into));
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_sample_width(mut self, sample_width: u16) -> Self {
        self.sample_width = Some(sample_width);
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Lowercased format name without a leading dot.
    pub fn normalized_format(&self) -> Option<String> {
        self.format
            .as_deref()
            .map(|f| f.trim_start_matches('.').to_ascii_lowercase())
    }
}

/// Mono signed 16-bit little-endian PCM plus its sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
}

/// Decodes an audio container down to mono 16-bit PCM.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, input: AudioInput<'_>, hints: &DecodeHints) -> Result<DecodedAudio>;
}

/// Video handed to a [`VideoProber`].
///
/// `File` lets the prober read straight from the descriptor; `Bytes` is the
/// fallback for in-memory streams.
#[derive(Debug, Clone, Copy)]
pub enum ProbeInput<'a> {
    File(&'a File),
    Bytes(&'a [u8]),
}

/// Duration and first-stream resolution of a video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Seconds.
    pub duration: f64,
    pub resolution: Resolution,
}

/// Reads video metadata.
pub trait VideoProber: Send + Sync {
    fn probe(&self, input: ProbeInput<'_>) -> Result<VideoMetadata>;
}

/// Which frames a [`FrameSampler`] should decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRequest {
    /// Frames per second to sample.
    pub fps: f64,
    /// Start of the sampling range in seconds (stream start if `None`).
    pub start: Option<f64>,
    /// End of the sampling range in seconds (stream end if `None`).
    pub end: Option<f64>,
    /// Output frame size; frames are scaled to it.
    pub resolution: Resolution,
}

impl FrameRequest {
    pub fn validate(&self) -> Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(Error::invalid_input(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start {
                return Err(Error::invalid_input(format!(
                    "end ({end}) is before start ({start})"
                )));
            }
        }
        if self.start.is_some_and(|s| s < 0.0) {
            return Err(Error::invalid_input("start must not be negative"));
        }
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(Error::invalid_input("frame resolution must be non-zero"));
        }
        Ok(())
    }
}

/// Time-ordered packed RGB24 frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledFrames {
    pub resolution: Resolution,
    pub frames: Vec<Vec<u8>>,
}

/// Decodes frames from a video file.
#[async_trait]
pub trait FrameSampler: Send + Sync {
    async fn sample(&self, path: &Path, request: &FrameRequest) -> Result<SampledFrames>;
}

/// The set of external capabilities available to part types.
///
/// Each slot is optional; asking for a missing one yields
/// [`Error::CapabilityUnavailable`].
#[derive(Clone, Default)]
pub struct Capabilities {
    audio_decoder: Option<Arc<dyn AudioDecoder>>,
    video_prober: Option<Arc<dyn VideoProber>>,
    frame_sampler: Option<Arc<dyn FrameSampler>>,
}

impl Capabilities {
    /// No capabilities at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Wire up the ffmpeg/ffprobe implementations for every tool found.
    pub fn discover(config: &ToolsConfig) -> Self {
        Self::from_registry(&ToolRegistry::discover(config))
    }

    pub fn from_registry(registry: &ToolRegistry) -> Self {
        let ffmpeg = registry.get("ffmpeg");
        let ffprobe = registry.get("ffprobe");

        let mut caps = Self::none();
        if let Some(ffprobe) = ffprobe {
            caps.video_prober = Some(Arc::new(FfprobeProber::new(ffprobe)));
        }
        if let (Some(ffmpeg), Some(ffprobe)) = (ffmpeg, ffprobe) {
            caps.audio_decoder = Some(Arc::new(FfmpegAudioDecoder::new(ffmpeg, ffprobe)));
        }
        if let Some(ffmpeg) = ffmpeg {
            caps.frame_sampler = Some(Arc::new(FfmpegFrameSampler::new(ffmpeg)));
        }
        caps
    }

    /// Process-wide capabilities discovered from `PATH` on first use.
    pub fn system() -> &'static Capabilities {
        static SYSTEM: OnceLock<Capabilities> = OnceLock::new();
        SYSTEM.get_or_init(|| Self::discover(&ToolsConfig::default()))
    }

    pub fn with_audio_decoder(mut self, decoder: Arc<dyn AudioDecoder>) -> Self {
        self.audio_decoder = Some(decoder);
        self
    }

    pub fn with_video_prober(mut self, prober: Arc<dyn VideoProber>) -> Self {
        self.video_prober = Some(prober);
        self
    }

    pub fn with_frame_sampler(mut self, sampler: Arc<dyn FrameSampler>) -> Self {
        self.frame_sampler = Some(sampler);
        self
    }

    pub fn audio_decoder(&self) -> Result<&dyn AudioDecoder> {
        self.audio_decoder.as_deref().ok_or_else(|| {
            Error::capability_unavailable(
                "audio decoder",
                "decoding this audio format requires ffmpeg and ffprobe",
            )
        })
    }

    pub fn video_prober(&self) -> Result<&dyn VideoProber> {
        self.video_prober.as_deref().ok_or_else(|| {
            Error::capability_unavailable("video prober", "probing video requires ffprobe")
        })
    }

    pub fn frame_sampler(&self) -> Result<&dyn FrameSampler> {
        self.frame_sampler.as_deref().ok_or_else(|| {
            Error::capability_unavailable(
                "frame sampler",
                "extracting video frames requires ffmpeg",
            )
        })
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("audio_decoder", &self.audio_decoder.is_some())
            .field("video_prober", &self.video_prober.is_some())
            .field("frame_sampler", &self.frame_sampler.is_some())
            .finish()
    }
}

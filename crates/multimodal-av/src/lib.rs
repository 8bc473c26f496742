//! # multimodal-av
//!
//! External media capabilities for multimodal message parts.
//!
//! Part types never decode containers or video streams themselves. Instead
//! they ask a [`Capabilities`] registry for one of three collaborators:
//!
//! - [`AudioDecoder`] - turns an arbitrary audio container into mono 16-bit PCM
//! - [`VideoProber`] - reads duration and resolution of a video stream
//! - [`FrameSampler`] - decodes RGB frames at a fixed rate
//!
//! The default implementations shell out to `ffmpeg`/`ffprobe`, located with
//! the [`ToolRegistry`]. A missing tool surfaces as
//! [`Error::CapabilityUnavailable`](multimodal_common::Error::CapabilityUnavailable),
//! never as a corrupt-input error.
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use multimodal_av::{Capabilities, ProbeInput, ToolsConfig};
//!
//! let caps = Capabilities::discover(&ToolsConfig::default());
//! let bytes = std::fs::read("/path/to/clip.mp4")?;
//! let meta = caps.video_prober()?.probe(ProbeInput::Bytes(&bytes))?;
//! println!("{}s at {}", meta.duration, meta.resolution);
//! # Ok::<(), multimodal_common::Error>(())
//! ```

pub mod capability;
pub mod decode;
pub mod frames;
pub mod probe;
pub mod tools;

// Re-exports
pub use capability::{
    AudioDecoder, AudioInput, Capabilities, DecodeHints, DecodedAudio, FrameRequest,
    FrameSampler, ProbeInput, SampledFrames, VideoMetadata, VideoProber,
};
pub use decode::{validate_hints, FfmpegAudioDecoder};
pub use frames::FfmpegFrameSampler;
pub use probe::FfprobeProber;
pub use tools::{ToolInfo, ToolRegistry, ToolsConfig};

//! Media probing.
//!
//! Uses ffprobe's JSON output. Video probing reads the stream over stdin so
//! it works for both descriptor-backed and in-memory parts.

mod ffprobe;

pub use ffprobe::{probe_audio_sample_rate, FfprobeProber};

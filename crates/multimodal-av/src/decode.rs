//! Audio container decoding via the ffmpeg CLI.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use multimodal_common::{Error, Result};

use crate::capability::{AudioDecoder, AudioInput, DecodeHints, DecodedAudio};
use crate::probe::probe_audio_sample_rate;
use crate::tools::run_captured;

/// [`AudioDecoder`] that converts anything ffmpeg can read to mono s16le.
///
/// The native sample rate is read with ffprobe first unless the hints
/// pin one, and the output is forced to that rate.
#[derive(Debug, Clone)]
pub struct FfmpegAudioDecoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegAudioDecoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    fn decode_path(&self, path: &Path, hints: &DecodeHints) -> Result<DecodedAudio> {
        let sample_rate = match hints.sample_rate {
            Some(sr) => sr,
            None => probe_audio_sample_rate(&self.ffprobe, path)?,
        };

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(build_args(path, hints, sample_rate));

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Decoding {} to mono s16le at {} Hz",
            path.display(),
            sample_rate
        );

        let mut pcm = run_captured("ffmpeg", &mut cmd, None)?;
        // Guard against a truncated trailing sample.
        pcm.truncate(pcm.len() - pcm.len() % 2);

        Ok(DecodedAudio { pcm, sample_rate })
    }
}

impl AudioDecoder for FfmpegAudioDecoder {
    fn decode(&self, input: AudioInput<'_>, hints: &DecodeHints) -> Result<DecodedAudio> {
        match input {
            AudioInput::Path(path) => self.decode_path(path, hints),
            AudioInput::Bytes(bytes) => {
                let suffix = hints
                    .normalized_format()
                    .map(|f| format!(".{f}"))
                    .unwrap_or_default();
                let mut spill = tempfile::Builder::new()
                    .prefix("multimodal-audio-")
                    .suffix(&suffix)
                    .tempfile()?;
                spill.write_all(bytes)?;
                spill.flush()?;
                self.decode_path(spill.path(), hints)
            }
        }
    }
}

/// `-f` is only emitted for an explicit format hint; file extensions are not
/// demuxer names.
fn build_args(path: &Path, hints: &DecodeHints, sample_rate: u32) -> Vec<String> {
    let mut args: Vec<String> = vec!["-v".into(), "error".into(), "-nostdin".into()];
    if let Some(format) = hints.normalized_format() {
        args.extend(["-f".into(), format]);
    }
    if let Some(codec) = &hints.codec {
        args.extend(["-acodec".into(), codec.clone()]);
    }
    args.extend(["-i".into(), path.to_string_lossy().into_owned()]);
    args.extend(hints.parameters.iter().cloned());
    args.extend(
        [
            "-f",
            "s16le",
            "-acodec",
            "pcm_s16le",
            "-ac",
            "1",
            "-ar",
        ]
        .map(String::from),
    );
    args.push(sample_rate.to_string());
    args.push("pipe:1".into());
    args
}

/// Reject hints that can never describe decodable input.
pub fn validate_hints(hints: &DecodeHints) -> Result<()> {
    if hints.sample_rate == Some(0) {
        return Err(Error::invalid_input("sample_rate must be positive"));
    }
    if hints.channels == Some(0) {
        return Err(Error::invalid_input("channels must be positive"));
    }
    if let Some(width) = hints.sample_width {
        if !matches!(width, 1..=4) {
            return Err(Error::invalid_input(format!(
                "sample_width must be 1-4 bytes, got {width}"
            )));
        }
    }
    Ok(())
}

//! Audio normalized to mono signed 16-bit PCM.

use std::fmt;
use std::io::Read;
use std::path::Path;

use multimodal_av::{validate_hints, AudioInput, Capabilities, DecodeHints, DecodedAudio};
use multimodal_common::{data_uri, mime, Error, Extra, Result};
use ndarray::{Array1, Array2, Axis};

use crate::fetch::{self, Downloader};
use crate::pcm;

/// Prefix every serialized audio part carries.
pub const WAV_URI_PREFIX: &str = "data:audio/wav;base64,";

/// Audio stored as raw mono signed 16-bit little-endian PCM.
///
/// Whatever the source container, constructors convert to this form, so
/// `raw().len()` is always even and [`duration`](Self::duration) is exact.
/// Resampling produces new buffers and never touches `raw`.
#[derive(Clone, PartialEq)]
pub struct AudioPart {
    raw: Vec<u8>,
    sample_rate: u32,
    pub extra: Extra,
}

impl AudioPart {
    /// Wrap PCM that is already mono s16le.
    pub fn new(raw: Vec<u8>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::invalid_input("sample_rate must be positive"));
        }
        if raw.len() % pcm::SAMPLE_WIDTH != 0 {
            return Err(Error::invalid_input(format!(
                "16-bit PCM must have an even byte length, got {}",
                raw.len()
            )));
        }
        Ok(Self {
            raw,
            sample_rate,
            extra: Extra::new(),
        })
    }

    /// Base64-encoded mono s16le PCM without a container.
    pub fn from_b64(data: &str, sample_rate: u32) -> Result<Self> {
        Self::new(data_uri::decode_b64(data)?, sample_rate)
    }

    /// Decode a local audio file.
    ///
    /// The format comes from `hints.format` or, failing that, the file
    /// extension. WAV and raw PCM are decoded in-process; other formats need
    /// the audio decoder capability, which only sees an explicit format hint
    /// and otherwise detects the container itself.
    pub fn from_file(
        path: impl AsRef<Path>,
        hints: &DecodeHints,
        capabilities: &Capabilities,
    ) -> Result<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str());
        if hints.format.is_none() && ext.is_none() {
            return Err(Error::configuration(format!(
                "The audio format of {:?} could not be determined; pass a format hint",
                path
            )));
        }
        tracing::debug!("Loading audio from {}", path.display());
        decode(AudioInput::Path(path), hints, ext, capabilities)
    }

    /// Decode audio from an open stream. The format hint is required.
    pub fn from_reader(
        mut reader: impl Read,
        hints: &DecodeHints,
        capabilities: &Capabilities,
    ) -> Result<Self> {
        if hints.format.is_none() {
            return Err(Error::configuration(
                "The audio format cannot be guessed from an open stream; pass a format hint",
            ));
        }
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        decode(AudioInput::Bytes(&buf), hints, None, capabilities)
    }

    /// Decode an in-memory container. WAV is sniffed when no format is given.
    pub fn from_bytes(data: &[u8], hints: &DecodeHints, capabilities: &Capabilities) -> Result<Self> {
        decode(AudioInput::Bytes(data), hints, None, capabilities)
    }

    /// Parse the serialized form, `data:audio/wav;base64,<wav>`.
    pub fn from_wav_b64_uri(uri: &str) -> Result<Self> {
        let payload = uri.strip_prefix(WAV_URI_PREFIX).ok_or_else(|| {
            Error::format(format!("Data URI must begin with `{WAV_URI_PREFIX}`"))
        })?;
        let (raw, sample_rate) = pcm::read_wav(&data_uri::decode_b64(payload)?)?;
        Self::new(raw, sample_rate)
    }

    /// Download audio into memory and decode it.
    ///
    /// `allowed_mime` defaults to `["audio/*"]`. The response's MIME type
    /// picks the in-process WAV path when no format hint is given.
    pub async fn from_url(
        downloader: &dyn Downloader,
        url: &str,
        allowed_mime: Option<&[String]>,
        hints: &DecodeHints,
        capabilities: &Capabilities,
    ) -> Result<Self> {
        let audio_only = ["audio/*".to_string()];
        let allowed = allowed_mime.unwrap_or(&audio_only);
        let (data, content_type) = fetch::fetch_to_memory(downloader, url, allowed).await?;

        let inferred = mime::extensions_for(&content_type).first().copied();
        decode(AudioInput::Bytes(&data), hints, inferred, capabilities)
    }

    /// The stored PCM.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Alias for [`sample_rate`](Self::sample_rate).
    pub fn sr(&self) -> u32 {
        self.sample_rate
    }

    pub fn with_extra(mut self, extra: Extra) -> Self {
        self.extra = extra;
        self
    }

    /// Seconds of audio: `len(raw) / (sample_rate * 2)`.
    pub fn duration(&self) -> f64 {
        self.raw.len() as f64 / (self.sample_rate as f64 * pcm::SAMPLE_WIDTH as f64)
    }

    /// Mono s16le PCM at `sr`; `raw` verbatim when `sr` is the stored rate.
    pub fn as_bytes(&self, sr: u32) -> Result<Vec<u8>> {
        if sr == self.sample_rate {
            return Ok(self.raw.clone());
        }
        pcm::resample(&self.raw, self.sample_rate, sr)
    }

    /// Base64 of [`as_bytes`](Self::as_bytes).
    pub fn as_b64(&self, sr: u32) -> Result<String> {
        Ok(data_uri::encode_b64(&self.as_bytes(sr)?))
    }

    /// Samples at `sr` scaled into `[-1.0, 1.0)` by dividing by 32768.
    pub fn as_ndarray(&self, sr: u32) -> Result<Array1<f32>> {
        Ok(Array1::from(pcm::to_f32(&self.as_bytes(sr)?)))
    }

    /// [`as_ndarray`](Self::as_ndarray) with a leading channel axis: shape
    /// `(1, samples)`.
    pub fn as_tensor(&self, sr: u32) -> Result<Array2<f32>> {
        Ok(self.as_ndarray(sr)?.insert_axis(Axis(0)))
    }

    /// `raw` inside a mono 16-bit WAV header. Samples are not re-encoded.
    pub fn as_wav_bytes(&self) -> Result<Vec<u8>> {
        pcm::write_wav(&self.raw, self.sample_rate)
    }

    /// `data:audio/wav;base64,<as_wav_bytes>`.
    pub fn as_wav_b64_uri(&self) -> Result<String> {
        Ok(format!(
            "{WAV_URI_PREFIX}{}",
            data_uri::encode_b64(&self.as_wav_bytes()?)
        ))
    }
}

fn is_wav(data: &[u8]) -> bool {
    data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WAVE"
}

/// `inferred` is a format guessed from a file name or content type. It only
/// selects the in-process decoders; the external decoder gets `hints` as is.
fn decode(
    input: AudioInput<'_>,
    hints: &DecodeHints,
    inferred: Option<&str>,
    capabilities: &Capabilities,
) -> Result<AudioPart> {
    validate_hints(hints)?;

    let format = hints
        .normalized_format()
        .or_else(|| inferred.map(|f| f.to_ascii_lowercase()));
    match (format.as_deref(), input) {
        (Some("wav" | "wave"), _) => {
            let bytes = read_input(input)?;
            let (raw, sample_rate) = pcm::read_wav(&bytes)?;
            AudioPart::new(raw, sample_rate)
        }
        (Some("pcm" | "raw" | "s16le"), _) => {
            let sample_rate = hints.sample_rate.ok_or_else(|| {
                Error::configuration("Raw PCM audio needs a sample_rate hint")
            })?;
            let bytes = read_input(input)?;
            let raw = pcm::interleaved_to_mono(
                &bytes,
                hints.sample_width.unwrap_or(pcm::SAMPLE_WIDTH as u16),
                hints.channels.unwrap_or(1),
            )?;
            AudioPart::new(raw, sample_rate)
        }
        (None, AudioInput::Bytes(bytes)) if is_wav(bytes) => {
            let (raw, sample_rate) = pcm::read_wav(bytes)?;
            AudioPart::new(raw, sample_rate)
        }
        _ => {
            let DecodedAudio { pcm, sample_rate } =
                capabilities.audio_decoder()?.decode(input, hints)?;
            AudioPart::new(pcm, sample_rate)
        }
    }
}

fn read_input(input: AudioInput<'_>) -> Result<Vec<u8>> {
    match input {
        AudioInput::Path(path) => Ok(std::fs::read(path)?),
        AudioInput::Bytes(bytes) => Ok(bytes.to_vec()),
    }
}

impl fmt::Debug for AudioPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioPart")
            .field("sample_rate", &self.sample_rate)
            .field("extra", &self.extra)
            .field("raw", &format_args!("[audio: {:.3}s]", self.duration()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(samples: &[i16], sr: u32) -> AudioPart {
        AudioPart::new(pcm::to_bytes(samples), sr).unwrap()
    }

    #[test]
    fn test_new_validates() {
        assert!(matches!(
            AudioPart::new(vec![0, 0, 0], 16000),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            AudioPart::new(vec![0, 0], 0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_duration_and_alias() {
        let audio = part(&[0; 48000], 24000);
        assert_eq!(audio.duration(), 2.0);
        assert_eq!(audio.sr(), audio.sample_rate());
    }

    #[test]
    fn test_same_rate_is_verbatim() {
        let audio = part(&[1, 2, 3, 4], 16000);
        assert_eq!(audio.as_bytes(16000).unwrap(), audio.raw());
    }

    #[test]
    fn test_views() {
        let audio = part(&[i16::MIN, 0, 16384], 8000);
        let arr = audio.as_ndarray(8000).unwrap();
        assert_eq!(arr.to_vec(), vec![-1.0, 0.0, 0.5]);
        let tensor = audio.as_tensor(8000).unwrap();
        assert_eq!(tensor.shape(), &[1, 3]);
    }

    #[test]
    fn test_raw_b64() {
        let audio = part(&[1, -1], 16000);
        let b64 = audio.as_b64(16000).unwrap();
        let back = AudioPart::from_b64(&b64, 16000).unwrap();
        assert_eq!(back, audio);
    }

    #[test]
    fn test_wav_uri_prefix_is_exact() {
        let audio = part(&[5, 6, 7], 22050);
        let uri = audio.as_wav_b64_uri().unwrap();
        assert!(uri.starts_with(WAV_URI_PREFIX));
        let back = AudioPart::from_wav_b64_uri(&uri).unwrap();
        assert_eq!(back.raw(), audio.raw());
        assert_eq!(back.sample_rate(), 22050);

        let wrong = uri.replacen("audio/wav", "audio/x-wav", 1);
        assert!(matches!(
            AudioPart::from_wav_b64_uri(&wrong),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_wav_is_sniffed_without_hint() {
        let audio = part(&[9, 8, 7], 11025);
        let wav = audio.as_wav_bytes().unwrap();
        let back = AudioPart::from_bytes(&wav, &DecodeHints::new(), &Capabilities::none()).unwrap();
        assert_eq!(back, audio);
    }

    #[test]
    fn test_raw_pcm_hints() {
        let stereo = pcm::to_bytes(&[100, 300, -100, -300]);
        let hints = DecodeHints::new()
            .with_format("pcm")
            .with_sample_rate(16000)
            .with_channels(2);
        let audio = AudioPart::from_bytes(&stereo, &hints, &Capabilities::none()).unwrap();
        assert_eq!(pcm::samples(audio.raw()).collect::<Vec<_>>(), vec![200, -200]);

        let missing_sr = DecodeHints::new().with_format("pcm");
        assert!(matches!(
            AudioPart::from_bytes(&stereo, &missing_sr, &Capabilities::none()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_compressed_format_without_decoder() {
        let hints = DecodeHints::new().with_format("mp3");
        let err = AudioPart::from_bytes(b"ID3\x03", &hints, &Capabilities::none()).unwrap_err();
        assert!(err.is_capability_unavailable());
    }

    #[test]
    fn test_reader_requires_format() {
        let reader = std::io::Cursor::new(vec![0u8; 4]);
        assert!(matches!(
            AudioPart::from_reader(reader, &DecodeHints::new(), &Capabilities::none()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_debug_shows_duration() {
        let audio = part(&[0; 24000], 24000);
        let repr = format!("{audio:?}");
        assert!(repr.contains("[audio: 1.000s]"), "{repr}");
        assert!(!repr.contains("[0, 0"));
    }
}

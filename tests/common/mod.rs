//! Shared fixtures for integration tests.
//!
//! Media is synthesized in code, and the external capabilities are replaced
//! by mocks so tests run without ffmpeg installed.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use multimodal::Capabilities;
use multimodal_av::{
    AudioDecoder, AudioInput, DecodeHints, DecodedAudio, FrameRequest, FrameSampler,
    ProbeInput, SampledFrames, VideoMetadata, VideoProber,
};
use multimodal_common::{Error, Resolution, Result};
use tempfile::NamedTempFile;

/// A sine-ish ramp of `len` samples.
pub fn ramp(len: usize) -> Vec<i16> {
    (0..len).map(|i| ((i * 37) % 2000) as i16 - 1000).collect()
}

/// Integer WAV with the given interleaved samples.
pub fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf
}

/// RGB gradient where pixel (x, y) is `[x, y, x + y]` modulo 256.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// Write `bytes` to a temp file ending in `suffix`.
pub fn temp_file(bytes: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

/// Prober returning fixed metadata and counting its calls. Fails the first
/// `failures` calls.
pub struct CountingProber {
    pub calls: AtomicUsize,
    failures: usize,
    metadata: VideoMetadata,
    pub saw_descriptor: AtomicBool,
    pub last_thread: Mutex<Option<ThreadId>>,
}

impl CountingProber {
    pub fn new(duration: f64, width: u32, height: u32) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures: 0,
            metadata: VideoMetadata {
                duration,
                resolution: Resolution::new(width, height),
            },
            saw_descriptor: AtomicBool::new(false),
            last_thread: Mutex::new(None),
        }
    }

    pub fn failing_first(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VideoProber for CountingProber {
    fn probe(&self, input: ProbeInput<'_>) -> Result<VideoMetadata> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_thread.lock().unwrap() = Some(std::thread::current().id());
        if matches!(input, ProbeInput::File(_)) {
            self.saw_descriptor.store(true, Ordering::SeqCst);
        }
        if call < self.failures {
            return Err(Error::tool_failed("ffprobe", "simulated failure"));
        }
        Ok(self.metadata)
    }
}

/// Sampler producing `count` solid frames; frame `t` is filled with `t`.
pub struct FixedSampler {
    pub count: usize,
    pub requests: Mutex<Vec<FrameRequest>>,
    pub path_existed: AtomicBool,
}

impl FixedSampler {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            requests: Mutex::new(Vec::new()),
            path_existed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl FrameSampler for FixedSampler {
    async fn sample(&self, path: &Path, request: &FrameRequest) -> Result<SampledFrames> {
        self.path_existed.store(path.is_file(), Ordering::SeqCst);
        self.requests.lock().unwrap().push(*request);
        let len = request.resolution.rgb24_frame_len();
        Ok(SampledFrames {
            resolution: request.resolution,
            frames: (0..self.count).map(|t| vec![t as u8; len]).collect(),
        })
    }
}

/// Decoder returning a fixed buffer and remembering the hints it was given.
pub struct FixedDecoder {
    pub output: DecodedAudio,
    pub last_hints: Mutex<Option<DecodeHints>>,
}

impl FixedDecoder {
    pub fn new(samples: &[i16], sample_rate: u32) -> Self {
        Self {
            output: DecodedAudio {
                pcm: multimodal::pcm::to_bytes(samples),
                sample_rate,
            },
            last_hints: Mutex::new(None),
        }
    }
}

impl AudioDecoder for FixedDecoder {
    fn decode(&self, _input: AudioInput<'_>, hints: &DecodeHints) -> Result<DecodedAudio> {
        *self.last_hints.lock().unwrap() = Some(hints.clone());
        Ok(self.output.clone())
    }
}

/// Capabilities with only a prober installed.
pub fn with_prober(prober: Arc<CountingProber>) -> Capabilities {
    Capabilities::none().with_video_prober(prober)
}

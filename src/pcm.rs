//! Mono signed 16-bit little-endian PCM helpers.
//!
//! Everything audio-related in this crate is normalized to this layout:
//! WAV input of any width, rate and channel count is folded down here, and
//! resampling and WAV wrapping operate on it.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use multimodal_common::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Bytes per stored sample.
pub const SAMPLE_WIDTH: usize = 2;

const RESAMPLE_CHUNK: usize = 1024;

/// Iterate the samples of a PCM buffer.
pub fn samples(pcm: &[u8]) -> impl Iterator<Item = i16> + '_ {
    pcm.chunks_exact(SAMPLE_WIDTH)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
}

/// Pack samples into a PCM buffer.
pub fn to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Map samples to `[-1.0, 1.0)` by dividing by 32768.
pub fn to_f32(pcm: &[u8]) -> Vec<f32> {
    samples(pcm).map(|s| s as f32 / 32768.0).collect()
}

fn from_f32(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

fn wav_error(err: hound::Error) -> Error {
    Error::format(format!("invalid WAV data: {err}"))
}

/// Decode a WAV container into mono 16-bit PCM at its native rate.
///
/// Channels are averaged (rounding toward negative infinity) at the source
/// width, then the result is shifted to 16 bits. Float WAVs are scaled by
/// 32768 and clamped.
pub fn read_wav(bytes: &[u8]) -> Result<(Vec<u8>, u32)> {
    let mut reader = WavReader::new(Cursor::new(bytes)).map_err(wav_error)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 || spec.sample_rate == 0 {
        return Err(Error::format("WAV header declares no channels or a zero rate"));
    }

    let mono: Vec<i16> = match spec.sample_format {
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if !(1..=32).contains(&bits) {
                return Err(Error::format(format!(
                    "unsupported WAV sample width: {bits} bits"
                )));
            }
            let interleaved = reader
                .samples::<i32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(wav_error)?;
            interleaved
                .chunks_exact(channels)
                .map(|frame| {
                    let sum: i64 = frame.iter().map(|&s| s as i64).sum();
                    let avg = sum.div_euclid(channels as i64);
                    let shifted = if bits >= 16 {
                        avg >> (bits - 16)
                    } else {
                        avg << (16 - bits)
                    };
                    shifted.clamp(i16::MIN as i64, i16::MAX as i64) as i16
                })
                .collect()
        }
        SampleFormat::Float => {
            let interleaved = reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(wav_error)?;
            interleaved
                .chunks_exact(channels)
                .map(|frame| {
                    let avg = frame.iter().sum::<f32>() / channels as f32;
                    (avg * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
                })
                .collect()
        }
    };

    Ok((to_bytes(&mono), spec.sample_rate))
}

/// Fold headerless little-endian PCM of any width and channel count down to
/// mono 16-bit.
///
/// 8-bit input is unsigned (offset 128), wider input is signed. A trailing
/// partial frame is dropped.
pub fn interleaved_to_mono(raw: &[u8], sample_width: u16, channels: u16) -> Result<Vec<u8>> {
    let width = sample_width as usize;
    let channels = channels as usize;
    if !(1..=4).contains(&width) {
        return Err(Error::audio(format!(
            "unsupported sample width: {sample_width} bytes"
        )));
    }
    if channels == 0 {
        return Err(Error::audio("channel count must be positive"));
    }
    if width == SAMPLE_WIDTH && channels == 1 {
        return Ok(raw[..raw.len() - raw.len() % SAMPLE_WIDTH].to_vec());
    }

    let bits = (width * 8) as u32;
    let decode = |b: &[u8]| -> i64 {
        match width {
            1 => b[0] as i64 - 128,
            2 => i16::from_le_bytes([b[0], b[1]]) as i64,
            3 => (i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8) as i64,
            _ => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
        }
    };

    let mono: Vec<i16> = raw
        .chunks_exact(width * channels)
        .map(|frame| {
            let sum: i64 = frame.chunks_exact(width).map(decode).sum();
            let avg = sum.div_euclid(channels as i64);
            let shifted = if bits >= 16 {
                avg >> (bits - 16)
            } else {
                avg << (16 - bits)
            };
            shifted.clamp(i16::MIN as i64, i16::MAX as i64) as i16
        })
        .collect();
    Ok(to_bytes(&mono))
}

/// Wrap PCM in a canonical mono 16-bit WAV container.
pub fn write_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut buf = Vec::with_capacity(44 + pcm.len());
    {
        let mut writer = WavWriter::new(Cursor::new(&mut buf), spec).map_err(wav_error)?;
        for sample in samples(pcm) {
            writer.write_sample(sample).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }
    Ok(buf)
}

/// Number of output samples a resample from `from` to `to` Hz produces.
pub fn resampled_len(len: usize, from: u32, to: u32) -> usize {
    (len as f64 * to as f64 / from as f64).round() as usize
}

/// Resample mono 16-bit PCM.
///
/// Returns the input unchanged when the rates match. Otherwise the output
/// has exactly [`resampled_len`] samples, so duration is preserved to within
/// one sample period.
pub fn resample(pcm: &[u8], from: u32, to: u32) -> Result<Vec<u8>> {
    if from == 0 || to == 0 {
        return Err(Error::audio("sample rates must be positive"));
    }
    if from == to {
        return Ok(pcm.to_vec());
    }

    let input = to_f32(pcm);
    let expected = resampled_len(input.len(), from, to);
    if expected == 0 {
        return Ok(Vec::new());
    }

    let ratio = to as f64 / from as f64;
    let mut resampler =
        FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Cubic, RESAMPLE_CHUNK, 1)
            .map_err(|e| Error::audio(format!("failed to create resampler: {e}")))?;
    let delay = resampler.output_delay();
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut pos = 0;
    while input.len() - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let frames = resampler
            .process(&[&input[pos..pos + n]], None)
            .map_err(|e| Error::audio(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
        pos += n;
    }
    if pos < input.len() {
        let tail: [&[f32]; 1] = [&input[pos..]];
        let frames = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| Error::audio(e.to_string()))?;
        output.extend_from_slice(&frames[0]);
    }
    // Flush the filter tail until the delayed signal is fully out.
    while output.len() < delay + expected {
        let frames = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| Error::audio(e.to_string()))?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    let mut resampled: Vec<i16> = output.iter().skip(delay).map(|&s| from_f32(s)).collect();
    resampled.resize(expected, 0);
    Ok(to_bytes(&resampled))
}

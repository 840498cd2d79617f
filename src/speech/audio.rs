//! WAV down-mixing to 16-bit mono.

use std::io::Cursor;

use camino::Utf8Path;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;
use tracing::info;

use crate::files;

/// Errors raised while reading or writing WAV audio.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AudioError {
    /// Raised when a file cannot be read or written.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path involved.
        path: String,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the input is not a WAV file hound can decode.
    #[error("invalid WAV data: {0}")]
    Decode(String),
    /// Raised when the mono output cannot be encoded.
    #[error("failed to encode WAV data: {0}")]
    Encode(String),
    /// Raised for sample layouts other than integer PCM or 32-bit float.
    #[error("unsupported sample format: {format:?} at {bits} bits")]
    Unsupported {
        /// Sample format of the input.
        format: SampleFormat,
        /// Bits per sample of the input.
        bits: u16,
    },
}

/// Shape of a converted clip.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MonoClip {
    /// Sample rate, unchanged from the input.
    pub sample_rate: u32,
    /// Channel count of the input.
    pub source_channels: u16,
    /// Number of mono frames written.
    pub frames: usize,
}

/// Reads the sample rate from a WAV header.
///
/// # Errors
///
/// Returns [`AudioError::Decode`] when the header is invalid.
pub fn sample_rate(bytes: &[u8]) -> Result<u32, AudioError> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(decode_error)?;
    Ok(reader.spec().sample_rate)
}

fn decode_error(err: hound::Error) -> AudioError {
    AudioError::Decode(err.to_string())
}

fn encode_error(err: hound::Error) -> AudioError {
    AudioError::Encode(err.to_string())
}

// Scales an integer sample of `bits` width to 16 bits.
fn to_i16_range(sample: i64, bits: u16) -> i64 {
    match bits {
        16 => sample,
        b if b > 16 => sample >> (b - 16),
        b => sample << (16 - b),
    }
}

#[expect(
    clippy::integer_division,
    clippy::integer_division_remainder_used,
    reason = "PCM averaging truncates toward zero"
)]
fn average_int_frames(samples: &[i32], channels: usize, bits: u16) -> Vec<i16> {
    samples
        .chunks(channels)
        .map(|frame| {
            let sum: i64 = frame
                .iter()
                .map(|sample| to_i16_range(i64::from(*sample), bits))
                .sum();
            let count = i64::try_from(frame.len()).unwrap_or(1).max(1);
            let mean = (sum / count).clamp(i64::from(i16::MIN), i64::from(i16::MAX));
            i16::try_from(mean).unwrap_or_default()
        })
        .collect()
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "float samples are averaged then clamped to the i16 range"
)]
fn average_float_frames(samples: &[f32], channels: usize) -> Vec<i16> {
    samples
        .chunks(channels)
        .map(|frame| {
            let sum: f32 = frame.iter().sum();
            let count = u16::try_from(frame.len()).map_or(f32::from(u16::MAX), f32::from);
            let mean = (sum / count.max(1.0)).clamp(-1.0, 1.0);
            (mean * f32::from(i16::MAX)).round() as i16
        })
        .collect()
}

/// Down-mixes WAV bytes to 16-bit PCM mono, averaging the channels of each
/// frame and keeping the sample rate.
///
/// # Errors
///
/// Returns [`AudioError`] when the input cannot be decoded, uses an
/// unsupported sample layout, or the output cannot be encoded.
pub fn mono_wav(bytes: &[u8]) -> Result<(Vec<u8>, MonoClip), AudioError> {
    let mut reader = WavReader::new(Cursor::new(bytes)).map_err(decode_error)?;
    let source = reader.spec();
    let channels = usize::from(source.channels.max(1));

    let mono = match (source.sample_format, source.bits_per_sample) {
        (SampleFormat::Int, 8..=32) => {
            let samples = reader
                .samples::<i32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode_error)?;
            average_int_frames(&samples, channels, source.bits_per_sample)
        }
        (SampleFormat::Float, 32) => {
            let samples = reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode_error)?;
            average_float_frames(&samples, channels)
        }
        (format, bits) => return Err(AudioError::Unsupported { format, bits }),
    };

    let spec = WavSpec {
        channels: 1,
        sample_rate: source.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut output = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut output, spec).map_err(encode_error)?;
        for sample in &mono {
            writer.write_sample(*sample).map_err(encode_error)?;
        }
        writer.finalize().map_err(encode_error)?;
    }

    let clip = MonoClip {
        sample_rate: source.sample_rate,
        source_channels: source.channels,
        frames: mono.len(),
    };
    Ok((output.into_inner(), clip))
}

/// Converts the WAV file at `input` to a 16-bit mono WAV file at `output`.
///
/// # Errors
///
/// Returns [`AudioError::Io`] when either file cannot be accessed, and the
/// errors of [`mono_wav`] otherwise.
pub fn convert_to_mono(input: &Utf8Path, output: &Utf8Path) -> Result<MonoClip, AudioError> {
    let bytes = files::read_bytes(input).map_err(|err| AudioError::Io {
        path: input.to_string(),
        message: err.to_string(),
    })?;
    let (mono, clip) = mono_wav(&bytes)?;
    files::write_bytes(output, &mono).map_err(|err| AudioError::Io {
        path: output.to_string(),
        message: err.to_string(),
    })?;
    info!(
        input = %input,
        output = %output,
        sample_rate = clip.sample_rate,
        source_channels = clip.source_channels,
        frames = clip.frames,
        "converted audio to mono"
    );
    Ok(clip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn stereo_wav(frames: &[(i16, i16)], sample_rate: u32) -> Vec<u8> {
        let spec = WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut output = Cursor::new(Vec::new());
        {
            let mut writer =
                WavWriter::new(&mut output, spec).unwrap_or_else(|err| panic!("writer: {err}"));
            for (left, right) in frames {
                writer
                    .write_sample(*left)
                    .unwrap_or_else(|err| panic!("write: {err}"));
                writer
                    .write_sample(*right)
                    .unwrap_or_else(|err| panic!("write: {err}"));
            }
            writer
                .finalize()
                .unwrap_or_else(|err| panic!("finalize: {err}"));
        }
        output.into_inner()
    }

    fn read_mono(bytes: &[u8]) -> (WavSpec, Vec<i16>) {
        let mut reader =
            WavReader::new(Cursor::new(bytes)).unwrap_or_else(|err| panic!("reader: {err}"));
        let spec = reader.spec();
        let samples = reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .unwrap_or_else(|err| panic!("samples: {err}"));
        (spec, samples)
    }

    #[rstest]
    fn averages_channels_and_keeps_rate() {
        let input = stereo_wav(&[(100, 300), (-200, 200), (i16::MAX, i16::MAX)], 44_100);
        let (bytes, clip) = mono_wav(&input).unwrap_or_else(|err| panic!("mono: {err}"));
        let (spec, samples) = read_mono(&bytes);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(samples, vec![200, 0, i16::MAX]);
        assert_eq!(
            clip,
            MonoClip {
                sample_rate: 44_100,
                source_channels: 2,
                frames: 3
            }
        );
    }

    #[rstest]
    fn float_sources_are_scaled_to_pcm() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut output = Cursor::new(Vec::new());
        {
            let mut writer =
                WavWriter::new(&mut output, spec).unwrap_or_else(|err| panic!("writer: {err}"));
            for sample in [1.0_f32, 1.0, -1.0, 0.0] {
                writer
                    .write_sample(sample)
                    .unwrap_or_else(|err| panic!("write: {err}"));
            }
            writer
                .finalize()
                .unwrap_or_else(|err| panic!("finalize: {err}"));
        }
        let (bytes, _) =
            mono_wav(&output.into_inner()).unwrap_or_else(|err| panic!("mono: {err}"));
        let (_, samples) = read_mono(&bytes);
        assert_eq!(samples, vec![i16::MAX, -16_384]);
    }

    #[rstest]
    #[case(i64::from(i16::MAX) << 8, 24, i64::from(i16::MAX))]
    #[case(127, 8, 127 << 8)]
    #[case(-42, 16, -42)]
    fn integer_samples_scale_to_sixteen_bits(
        #[case] sample: i64,
        #[case] bits: u16,
        #[case] expected: i64,
    ) {
        assert_eq!(to_i16_range(sample, bits), expected);
    }

    #[rstest]
    fn sample_rate_reads_header() {
        let input = stereo_wav(&[(0, 0)], 22_050);
        assert_eq!(sample_rate(&input), Ok(22_050));
    }

    #[rstest]
    fn rejects_non_wav_input() {
        let err = mono_wav(b"not a wav file").expect_err("garbage input");
        assert!(matches!(err, AudioError::Decode(_)));
    }
}
